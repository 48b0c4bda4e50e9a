//! On-disk Open Graph metadata cache.
//!
//! The cache file is a JSON object keyed by source URL:
//!
//! ```json
//! {
//!   "https://example.com/": {
//!     "url": "https://example.com/",
//!     "title": "Example Domain",
//!     "siteName": "example.com",
//!     "favicon": "https://example.com/favicon.ico",
//!     "fetchedAt": 1704067200000
//!   }
//! }
//! ```
//!
//! Records are reused while younger than the TTL and re-fetched afterwards.
//! A missing or unreadable cache file just means an empty store; the next
//! [`OgpStore::save`] replaces it.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Open Graph metadata for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OgpRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    /// Unix time in milliseconds.
    pub fetched_at: i64,
}

/// URL-keyed store of [`OgpRecord`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OgpStore {
    records: BTreeMap<String, OgpRecord>,
}

impl OgpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store from `path`. A missing or corrupt file yields an
    /// empty store.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::new(),
        };
        match serde_json::from_str(&content) {
            Ok(store) => store,
            Err(e) => {
                warn!("Ignoring unreadable OGP cache {}: {e}", path.display());
                Self::new()
            }
        }
    }

    /// Write the store to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    pub fn get(&self, url: &str) -> Option<&OgpRecord> {
        self.records.get(url)
    }

    /// The record for `url`, if present and not expired at `now_ms`.
    pub fn get_fresh(&self, url: &str, now_ms: i64, ttl_ms: i64) -> Option<&OgpRecord> {
        self.get(url)
            .filter(|record| !Self::is_expired(record, now_ms, ttl_ms))
    }

    /// Insert or replace the record for `record.url`.
    pub fn put(&mut self, record: OgpRecord) {
        self.records.insert(record.url.clone(), record);
    }

    /// A record is expired once it is at least `ttl_ms` old.
    pub fn is_expired(record: &OgpRecord, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms - record.fetched_at >= ttl_ms
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
