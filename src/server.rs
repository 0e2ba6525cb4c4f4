//! HTTP transport.
//!
//! A single axum fallback handler turns every incoming request into a
//! [`router::Request`], runs the blocking route table on the blocking pool,
//! and converts the result back. Access logging happens here, under the
//! `gazette::access` target, once when the request arrives and once when the
//! response is ready.

use crate::router::{self, Request, Response};
use crate::site::Site;
use axum::Router;
use axum::extract::{ConnectInfo, State};
use axum::http::header::{CONTENT_TYPE, HOST, LOCATION, USER_AGENT};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot load TLS certificate or key: {0}")]
    Tls(#[source] std::io::Error),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// PEM certificate chain and private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    pub listen: SocketAddr,
    pub tls: Option<TlsFiles>,
}

/// The axum application serving `site`.
pub fn app(site: Arc<Site>) -> Router {
    Router::new().fallback(handle_request).with_state(site)
}

/// Listen until SIGINT or SIGTERM, over TLS when certificate files are given.
pub async fn serve(site: Arc<Site>, options: ServeOptions) -> Result<(), ServeError> {
    let app = app(site);
    let addr = options.listen;
    match options.tls {
        None => {
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|source| ServeError::Bind { addr, source })?;
            info!(%addr, "listening");
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        }
        Some(tls) => {
            let config = axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .map_err(ServeError::Tls)?;
            let handle = axum_server::Handle::new();
            tokio::spawn({
                let handle = handle.clone();
                async move {
                    shutdown_signal().await;
                    handle.graceful_shutdown(Some(Duration::from_secs(10)));
                }
            });
            info!(%addr, cert = %tls.cert.display(), "listening with TLS");
            axum_server::bind_rustls(addr, config)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await?;
        }
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received");
}

async fn handle_request(
    State(site): State<Arc<Site>>,
    request: axum::extract::Request,
) -> axum::response::Response {
    let (parts, _body) = request.into_parts();
    let remote = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let host = header_str(&parts.headers, HOST)
        .or_else(|| parts.uri.host())
        .unwrap_or_default()
        .to_string();
    let req = Request {
        method: parts.method,
        host,
        path: parts.uri.path().to_string(),
    };
    info!(
        target: "gazette::access",
        method = %req.method,
        host = %req.host,
        path = %req.path,
        user_agent = header_str(&parts.headers, USER_AGENT).unwrap_or("-"),
        protocol = ?parts.version,
        remote = %remote,
        "request"
    );

    let started = Instant::now();
    let path = req.path.clone();
    let resp = match tokio::task::spawn_blocking(move || router::handle(&site, &req)).await {
        Ok(resp) => resp,
        Err(e) => Response::internal_error(&e),
    };
    info!(
        target: "gazette::access",
        path = %path,
        status = resp.status.as_u16(),
        content_type = %resp.content_type,
        route = resp.route.name(),
        bytes = resp.body.len(),
        info = resp.info.as_deref().unwrap_or(""),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "response"
    );
    into_http(resp)
}

fn header_str(headers: &HeaderMap, name: axum::http::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn into_http(resp: Response) -> axum::response::Response {
    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&resp.content_type) {
        Ok(value) => {
            headers.insert(CONTENT_TYPE, value);
        }
        Err(_) => warn!(content_type = %resp.content_type, "invalid content type header"),
    }
    if let Some(location) = &resp.location {
        match HeaderValue::from_str(location) {
            Ok(value) => {
                headers.insert(LOCATION, value);
            }
            Err(_) => warn!(%location, "invalid redirect target"),
        }
    }
    (resp.status, headers, resp.body).into_response()
}
