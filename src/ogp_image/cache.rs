//! Render cache for incremental OGP image builds.
//!
//! Rasterizing is the slow part of the generator. This module lets a run
//! skip posts whose image would come out identical to the one already on
//! disk.
//!
//! # Design
//!
//! The cache is **content-addressed**: each post's entry is a SHA-256 over
//! everything that affects its pixels:
//!
//! - the post's title, slug, date and tags,
//! - the site name,
//! - the base image bytes and the font bytes.
//!
//! Asset bytes are hashed once per run ([`hash_assets`]) and folded into each
//! post's hash ([`hash_render`]). Changing the background, the font, or
//! anything printed on the card re-renders exactly the affected images.
//!
//! A cache hit requires:
//! 1. An entry for the slug with a matching hash exists
//! 2. `{slug}.png` still exists in the output directory
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<output_dir>/.ogp-manifest.json`, next to
//! the images it describes.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to `ogp-images` or `prebuild` to start from an empty
//! manifest, so every image is rendered again.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use super::layout::OgpImageSpec;

/// Name of the manifest file within the output directory.
const MANIFEST_FILENAME: &str = ".ogp-manifest.json";

/// Version of the manifest format. Bump this to invalidate all existing
/// caches when the layout or hash computation changes.
const MANIFEST_VERSION: u32 = 1;

/// On-disk manifest mapping slugs to the hash of their last render.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RenderManifest {
    pub version: u32,
    pub entries: BTreeMap<String, String>,
}

impl RenderManifest {
    /// Create an empty manifest (used for `--no-cache` or first build).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load from the output directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(output_dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION => m,
            _ => Self::empty(),
        }
    }

    /// Save to the output directory.
    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(output_dir), json)
    }

    /// Whether `{slug}.png` in `output_dir` was rendered from `hash`.
    pub fn is_current(&self, slug: &str, hash: &str, output_dir: &Path) -> bool {
        self.entries.get(slug).is_some_and(|h| h == hash)
            && output_dir.join(format!("{slug}.png")).exists()
    }

    /// Record the hash an image was rendered from.
    pub fn insert(&mut self, slug: String, hash: String) {
        self.entries.insert(slug, hash);
    }

    /// Drop every entry whose slug is not in `slugs`.
    pub fn retain_slugs(&mut self, slugs: &[String]) {
        self.entries.retain(|slug, _| slugs.contains(slug));
    }
}

/// Resolve the manifest path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

/// SHA-256 over the base image and font bytes, as a hex string.
pub fn hash_assets(background: &[u8], font: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"background\0");
    hasher.update((background.len() as u64).to_le_bytes());
    hasher.update(background);
    hasher.update(b"font\0");
    hasher.update((font.len() as u64).to_le_bytes());
    hasher.update(font);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 over one post's card inputs plus the shared assets hash.
pub fn hash_render(spec: &OgpImageSpec, site_name: &str, assets_hash: &str) -> String {
    let mut hasher = Sha256::new();
    // Length-prefixed fields so ("ab", "c") and ("a", "bc") differ
    let mut field = |bytes: &[u8]| {
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    };
    field(spec.title.as_bytes());
    field(spec.slug.as_bytes());
    field(spec.date.as_bytes());
    field(&(spec.tags.len() as u64).to_le_bytes());
    for tag in &spec.tags {
        field(tag.as_bytes());
    }
    field(site_name.as_bytes());
    field(assets_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} rendered ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} rendered", self.misses)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn spec() -> OgpImageSpec {
        OgpImageSpec {
            title: "Hello World".to_string(),
            slug: "hello-world".to_string(),
            date: "2024-01-01".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
        }
    }

    // =========================================================================
    // RenderManifest basics
    // =========================================================================

    #[test]
    fn empty_manifest_has_no_entries() {
        let m = RenderManifest::empty();
        assert_eq!(m.version, MANIFEST_VERSION);
        assert!(m.entries.is_empty());
    }

    #[test]
    fn is_current_hit() {
        let tmp = TempDir::new().unwrap();
        let mut m = RenderManifest::empty();
        m.insert("post".into(), "h1".into());
        fs::write(tmp.path().join("post.png"), "png").unwrap();

        assert!(m.is_current("post", "h1", tmp.path()));
    }

    #[test]
    fn is_current_miss_wrong_hash() {
        let tmp = TempDir::new().unwrap();
        let mut m = RenderManifest::empty();
        m.insert("post".into(), "h1".into());
        fs::write(tmp.path().join("post.png"), "png").unwrap();

        assert!(!m.is_current("post", "h2", tmp.path()));
    }

    #[test]
    fn is_current_miss_file_deleted() {
        let tmp = TempDir::new().unwrap();
        let mut m = RenderManifest::empty();
        m.insert("post".into(), "h1".into());
        // File doesn't exist
        assert!(!m.is_current("post", "h1", tmp.path()));
    }

    #[test]
    fn is_current_miss_no_entry() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("post.png"), "png").unwrap();
        assert!(!RenderManifest::empty().is_current("post", "h1", tmp.path()));
    }

    #[test]
    fn insert_replaces_hash() {
        let mut m = RenderManifest::empty();
        m.insert("post".into(), "old".into());
        m.insert("post".into(), "new".into());
        assert_eq!(m.entries.len(), 1);
        assert_eq!(m.entries["post"], "new");
    }

    #[test]
    fn retain_slugs_drops_stale_entries() {
        let mut m = RenderManifest::empty();
        m.insert("kept".into(), "h1".into());
        m.insert("renamed-away".into(), "h2".into());

        m.retain_slugs(&["kept".to_string(), "new".to_string()]);

        assert_eq!(m.entries.len(), 1);
        assert_eq!(m.entries["kept"], "h1");
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut m = RenderManifest::empty();
        m.insert("a".into(), "h".into());
        m.save(tmp.path()).unwrap();

        assert_eq!(RenderManifest::load(tmp.path()), m);
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(RenderManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn load_corrupt_json_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(manifest_path(tmp.path()), "not json").unwrap();
        assert!(RenderManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn load_wrong_version_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            manifest_path(tmp.path()),
            r#"{"version": 999, "entries": {"a": "h"}}"#,
        )
        .unwrap();
        assert!(RenderManifest::load(tmp.path()).entries.is_empty());
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    #[test]
    fn render_hash_is_deterministic() {
        let assets = hash_assets(b"bg", b"font");
        assert_eq!(
            hash_render(&spec(), "site", &assets),
            hash_render(&spec(), "site", &assets)
        );
        assert_eq!(hash_render(&spec(), "site", &assets).len(), 64);
    }

    #[test]
    fn render_hash_tracks_every_input() {
        let assets = hash_assets(b"bg", b"font");
        let base = hash_render(&spec(), "site", &assets);

        let mut title = spec();
        title.title.push('!');
        let mut tags = spec();
        tags.tags.pop();
        let mut date = spec();
        date.date = "2024-01-02".into();

        assert_ne!(hash_render(&title, "site", &assets), base);
        assert_ne!(hash_render(&tags, "site", &assets), base);
        assert_ne!(hash_render(&date, "site", &assets), base);
        assert_ne!(hash_render(&spec(), "other", &assets), base);
        assert_ne!(
            hash_render(&spec(), "site", &hash_assets(b"bg2", b"font")),
            base
        );
    }

    #[test]
    fn field_boundaries_matter() {
        let assets = hash_assets(b"", b"");
        let mut a = spec();
        a.tags = vec!["ab".into(), "c".into()];
        let mut b = spec();
        b.tags = vec!["a".into(), "bc".into()];
        assert_ne!(
            hash_render(&a, "s", &assets),
            hash_render(&b, "s", &assets)
        );
    }

    #[test]
    fn asset_hash_distinguishes_split_point() {
        assert_ne!(hash_assets(b"ab", b"c"), hash_assets(b"a", b"bc"));
    }

    // =========================================================================
    // CacheStats display
    // =========================================================================

    #[test]
    fn cache_stats_display_with_hits() {
        let stats = CacheStats { hits: 3, misses: 2 };
        assert_eq!(stats.to_string(), "3 cached, 2 rendered (5 total)");
    }

    #[test]
    fn cache_stats_display_no_hits() {
        let stats = CacheStats { hits: 0, misses: 4 };
        assert_eq!(stats.to_string(), "4 rendered");
    }
}
