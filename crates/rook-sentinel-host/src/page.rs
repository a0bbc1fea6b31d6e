//! File-backed page.
//!
//! Treats an HTML file on disk as the live page. The file is re-read on
//! every access, so rewriting it (by hand or from a browser-side exporter)
//! drives the detectors. Move-list watching polls the file and forwards
//! newly appended children of the move-list container.

use std::path::{Path, PathBuf};
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use tokio::sync::mpsc;

use rook_sentinel::{MoveNode, Page, PageLoad};

use crate::error::{HostError, HostResult};

const CANONICAL_SELECTOR: &str = r#"link[rel="canonical"]"#;

/// An HTML document on disk standing in for a browser tab.
#[derive(Debug, Clone)]
pub struct FilePage {
    path: PathBuf,
    url_override: Option<String>,
    poll_interval: Duration,
}

impl FilePage {
    pub fn new(path: impl Into<PathBuf>, url_override: Option<String>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            url_override,
            poll_interval,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, failing if the file is missing.
    pub fn read(&self) -> HostResult<String> {
        std::fs::read_to_string(&self.path)
            .map_err(|e| HostError::Page(format!("{}: {e}", self.path.display())))
    }

    fn url_for(&self, html: Option<&str>) -> String {
        if let Some(url) = &self.url_override {
            return url.clone();
        }
        html.and_then(canonical_url)
            .unwrap_or_else(|| format!("file://{}", self.path.display()))
    }
}

impl Page for FilePage {
    fn url(&self) -> String {
        if self.url_override.is_some() {
            return self.url_for(None);
        }
        self.url_for(self.document().as_deref())
    }

    fn document(&self) -> Option<String> {
        match self.read() {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::trace!("{e}");
                None
            }
        }
    }

    fn load(&self) -> PageLoad {
        let document = self.document();
        PageLoad {
            url: self.url_for(document.as_deref()),
            document,
        }
    }

    fn observe_move_list(&self, selectors: &[String]) -> Option<mpsc::UnboundedReceiver<MoveNode>> {
        let html = self.document()?;
        let initial = move_list_entries(&html, selectors)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let page = self.clone();
        let selectors = selectors.to_vec();

        tokio::spawn(async move {
            let mut seen = initial;
            loop {
                tokio::time::sleep(page.poll_interval).await;
                if tx.is_closed() {
                    break;
                }

                let entries = page
                    .document()
                    .and_then(|html| move_list_entries(&html, &selectors));
                let Some(entries) = entries else {
                    tracing::debug!("Move list container gone from {}", page.path.display());
                    break;
                };

                // A shorter or rewritten list means the container was replaced.
                if entries.len() < seen.len() || entries[..seen.len()] != seen[..] {
                    tracing::debug!("Move list container replaced");
                    break;
                }

                for node in &entries[seen.len()..] {
                    if tx.send(node.clone()).is_err() {
                        return;
                    }
                }
                seen = entries;
            }
        });

        Some(rx)
    }
}

/// Entries currently in the first matching move-list container, or `None`
/// when no selector matches.
pub fn move_list_entries(html: &str, selectors: &[String]) -> Option<Vec<MoveNode>> {
    let document = Html::parse_document(html);
    let container = selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|sel| document.select(&sel).next())?;

    let entries = container
        .children()
        .filter_map(ElementRef::wrap)
        .map(MoveNode::from_element)
        .collect();
    Some(entries)
}

fn canonical_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(CANONICAL_SELECTOR).ok()?;
    let href = document
        .select(&selector)
        .next()?
        .value()
        .attr("href")?
        .trim()
        .to_string();
    (!href.is_empty()).then_some(href)
}
