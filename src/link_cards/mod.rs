//! Link-card enricher.
//!
//! Rewrites posts in place before the site build: every line that is just a
//! bare URL becomes an HTML preview card built from the page's Open Graph
//! metadata. The build output is meant to be thrown away with
//! `git restore` afterwards, so the source stays plain Markdown.
//!
//! ## Pipeline
//!
//! ```text
//! content/*.md ──► scan::extract_standalone_urls ──► resolve (store, then HTTP)
//!                                                        │
//!        content/*.md ◄── scan::transform_content ◄──────┘
//! ```
//!
//! - [`scan`]: line state machine (front matter, code fences, candidates).
//! - [`metadata`]: Open Graph extraction from HTML, fallback records.
//! - [`card`]: single-line card HTML.
//!
//! ## Caching
//!
//! Metadata lives in an [`OgpStore`] that the caller loads before and saves
//! after [`enrich`]. A record younger than the TTL is reused without network
//! access. Failed fetches produce a fallback record (hostname as title) that
//! is stored like any other, so a dead link is retried once per TTL, not once
//! per build.

pub mod card;
pub mod metadata;
pub mod scan;

use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::LinkCardsConfig;
use crate::content::{self, ContentFile, SkipReason, Skipped};
use crate::front_matter;
use crate::http::{HttpClient, HttpRequest};
use crate::store::{OgpRecord, OgpStore};

pub use metadata::{fallback_record, parse_ogp_from_html};
pub use scan::{extract_standalone_urls, transform_content};

/// `Accept` header sent when fetching pages.
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[derive(Error, Debug)]
pub enum LinkCardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Content directory not found: {0}")]
    ContentDirMissing(PathBuf),
}

/// Where a resolved record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Fresh record already in the store.
    Cached,
    /// Fetched and parsed from the page.
    Fetched,
    /// The fetch failed; hostname-only record.
    Fallback,
}

/// Outcome of an enrichment run.
#[derive(Debug, Default)]
pub struct LinkCardReport {
    /// Posts looked at (including skipped ones).
    pub scanned: usize,
    /// Posts whose content changed and were written back.
    pub rewritten: Vec<String>,
    /// Candidate lines replaced by a card.
    pub cards: usize,
    pub cached: usize,
    pub fetched: usize,
    pub fallback: usize,
    pub skipped: Vec<Skipped>,
}

impl LinkCardReport {
    fn count(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Cached => self.cached += 1,
            Resolution::Fetched => self.fetched += 1,
            Resolution::Fallback => self.fallback += 1,
        }
    }
}

/// Resolve `url` to a record, from the store when fresh, otherwise over HTTP.
///
/// Fetched and fallback records are both put into the store.
pub async fn resolve<C: HttpClient>(
    url: &str,
    store: &mut OgpStore,
    client: &C,
    config: &LinkCardsConfig,
    now_ms: i64,
) -> (OgpRecord, Resolution) {
    if let Some(record) = store.get_fresh(url, now_ms, config.ttl_millis()) {
        debug!("Cache hit: {url}");
        return (record.clone(), Resolution::Cached);
    }

    info!("Fetching OGP: {url}");
    let request = HttpRequest::get(url)
        .user_agent(&config.user_agent)
        .accept(ACCEPT_HTML)
        .accept_language(&config.accept_language)
        .timeout(config.timeout());

    let (record, resolution) = match client.get(&request).await {
        Ok(response) if response.is_success() => (
            parse_ogp_from_html(&response.text(), url, now_ms),
            Resolution::Fetched,
        ),
        Ok(response) => {
            warn!("Failed to fetch {url}: HTTP {}", response.status);
            (fallback_record(url, now_ms), Resolution::Fallback)
        }
        Err(e) => {
            warn!("Error fetching {url}: {e}");
            (fallback_record(url, now_ms), Resolution::Fallback)
        }
    };

    store.put(record.clone());
    (record, resolution)
}

/// Enrich every post in `content_dir`, resolving through `store`.
///
/// Posts without a valid slug are skipped untouched. A post is written back
/// only when its content actually changed. The caller saves `store`.
pub async fn enrich<C: HttpClient>(
    content_dir: &Path,
    store: &mut OgpStore,
    client: &C,
    config: &LinkCardsConfig,
    now_ms: i64,
) -> Result<LinkCardReport, LinkCardError> {
    if !content_dir.is_dir() {
        return Err(LinkCardError::ContentDirMissing(content_dir.to_path_buf()));
    }

    let files = content::list_markdown_files(content_dir)?;
    let mut report = LinkCardReport::default();
    if files.is_empty() {
        info!("No Markdown files found in {}", content_dir.display());
        return Ok(report);
    }

    for path in &files {
        report.scanned += 1;
        let post = match ContentFile::read(path) {
            Ok(post) => post,
            Err(e) => {
                skip(&mut report, path, SkipReason::Unreadable(e.to_string()));
                continue;
            }
        };

        if let Err(reason) = front_matter::parse(&post.raw)
            .map_err(SkipReason::FrontMatter)
            .and_then(|fm| content::slug_from(&fm).map(|_| ()))
        {
            skip(&mut report, path, reason);
            continue;
        }

        let urls = extract_standalone_urls(&post.raw);
        if urls.is_empty() {
            continue;
        }
        info!("Processing {} ({} URLs)", post.file_name, urls.len());

        let mut cards: HashMap<String, OgpRecord> = HashMap::new();
        for url in &urls {
            if cards.contains_key(url) {
                continue;
            }
            let (record, resolution) = resolve(url, store, client, config, now_ms).await;
            report.count(resolution);
            cards.insert(url.clone(), record);
        }

        let transformed = transform_content(&post.raw, &cards);
        if transformed != post.raw {
            std::fs::write(&post.path, &transformed)?;
            report.cards += urls.len();
            report.rewritten.push(post.file_name);
        }
    }

    Ok(report)
}

/// Load the store, [`enrich`] the content directory, and save the store.
pub async fn prebuild_link_cards<C: HttpClient>(
    content_dir: &Path,
    cache_file: &Path,
    client: &C,
    config: &LinkCardsConfig,
    now_ms: i64,
) -> Result<LinkCardReport, LinkCardError> {
    let mut store = OgpStore::load(cache_file);
    info!("Loaded {} cached OGP entries", store.len());

    let report = enrich(content_dir, &mut store, client, config, now_ms).await?;

    store.save(cache_file)?;
    Ok(report)
}

fn skip(report: &mut LinkCardReport, path: &Path, reason: SkipReason) {
    let file = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    warn!("Skipping {file}: {reason}");
    report.skipped.push(Skipped { file, reason });
}
