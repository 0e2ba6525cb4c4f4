use clap::{Parser, Subcommand};
use gazette::config;
use gazette::files::SafeFiles;
use gazette::output::{self, CheckReport};
use gazette::server::{self, ServeOptions, TlsFiles};
use gazette::site::Site;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "gazette")]
#[command(about = "Serves a chronological publication from flat files")]
#[command(long_about = "\
Serves a chronological publication from flat files

The content root is the data source. A CSV catalog lists the articles, each
article body is a markdown file, and authors are HTML fragments. The catalog
is reloaded periodically, so publishing means editing files in place.

Content structure:

  content/
  ├── config.toml                  # Optional, overrides stock settings
  ├── articles.csv                 # published,slug,title,author,short_id
  ├── zerm/                        # Article bodies
  │   └── erste-ausgabe.md         # Served at /zerm/erste-ausgabe
  ├── authors/
  │   └── anna.html                # Bio shown under each article by anna
  ├── 2020.pdf                     # Optional print edition of 2020
  ├── 2020.svg                     # ...and its cover
  └── style.css                    # Anything else is served as-is

Catalog timestamps look like `24.12.2021 18:00:00 CET`. Rows dated in the
future stay hidden until their time has come.

Run 'gazette gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Content root
    #[arg(long, env = "GAZETTE_ROOT", default_value = "content", global = true)]
    root: PathBuf,

    /// Address to listen on
    #[arg(long, env = "GAZETTE_LISTEN", default_value = "0.0.0.0:8099", global = true)]
    listen: SocketAddr,

    /// PEM certificate chain; serves HTTPS together with --tls-key
    #[arg(long, env = "GAZETTE_TLS_CERT", requires = "tls_key", global = true)]
    tls_cert: Option<PathBuf>,

    /// PEM private key for --tls-cert
    #[arg(long, env = "GAZETTE_TLS_KEY", requires = "tls_cert", global = true)]
    tls_key: Option<PathBuf>,

    /// Log JSON lines instead of human-readable text
    #[arg(long, env = "GAZETTE_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load the catalog and serve the publication (default)
    Serve,
    /// Load the catalog once and list articles, editions and short links
    Check {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let site = Arc::new(open_site(&cli.root)?);
            let tls = match (cli.tls_cert, cli.tls_key) {
                (Some(cert), Some(key)) => Some(TlsFiles { cert, key }),
                _ => None,
            };
            server::serve(
                site,
                ServeOptions {
                    listen: cli.listen,
                    tls,
                },
            )
            .await?;
        }
        Command::Check { json } => {
            let site = open_site(&cli.root)?;
            let report = CheckReport::build(site.config(), &site.snapshot(), site.files());
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("==> Checking {}", cli.root.display());
                output::print_check_output(&report);
                match report.missing_files() {
                    0 => println!("==> Content is valid"),
                    n => println!("==> {n} referenced files are missing"),
                }
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn open_site(root: &std::path::Path) -> Result<Site, Box<dyn std::error::Error>> {
    let site_config = config::load_config(root)?;
    tracing::info!(root = %root.display(), "opening content root");
    Ok(Site::open(site_config, Box::new(SafeFiles::new(root)))?)
}

/// Logs go to stderr so `check --json` output stays parseable.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
