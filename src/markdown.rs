//! Article markdown → HTML.
//!
//! Article bodies are CommonMark with a handful of house escapes that the
//! authors type on keyboards without German quotation marks:
//!
//! | Source | Output |
//! |--------|--------|
//! | `\,`   | `„` (low opening quote) |
//! | `\'`   | `“` (high closing quote) |
//! | `\{note\}` | numbered footnote reference `<sup>[n]</sup>` |
//!
//! Rendering runs in three stages:
//!
//! ```text
//! preprocess  (escapes → quotes, footnote marker + "(")
//! convert     (pulldown-cmark)
//! postprocess (footnote marker → <sup>[n]</sup>, numbered per document)
//! ```
//!
//! Pre- and postprocessing are single left-to-right scans with no
//! backtracking. Each stage is a pure function of its input, so rendering
//! the same bytes twice gives the same HTML and footnote numbering always
//! restarts at 1.

use pulldown_cmark::{Parser, html as md_html};

/// Placeholder for a footnote reference while the text passes through the
/// markdown converter. Backslash + letter is not a CommonMark escape, so the
/// sequence survives conversion byte for byte.
const FOOTNOTE_MARKER: &str = r"\fn\ref\mark";

/// Render article markdown to HTML.
pub fn render(source: &[u8]) -> String {
    let text = String::from_utf8_lossy(source);
    postprocess(&convert(&preprocess(&text)))
}

/// Replace the house escapes. Unknown `\x` pairs are left for the markdown
/// converter to interpret.
pub fn preprocess(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let replacement = match chars.peek() {
            Some(',') => "„",
            Some('\'') => "“",
            Some('{') => {
                out.push('[');
                out.push_str(FOOTNOTE_MARKER);
                "]("
            }
            Some('}') => ")",
            _ => {
                out.push('\\');
                continue;
            }
        };
        chars.next();
        out.push_str(replacement);
    }
    out
}

/// Delegate to pulldown-cmark.
pub fn convert(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html
}

/// Number the footnote markers in document order, starting at 1.
pub fn postprocess(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut n = 0u32;

    while let Some(pos) = rest.find(FOOTNOTE_MARKER) {
        n += 1;
        out.push_str(&rest[..pos]);
        out.push_str(&format!("<sup>[{n}]</sup>"));
        rest = &rest[pos + FOOTNOTE_MARKER.len()..];
    }
    out.push_str(rest);
    out
}
