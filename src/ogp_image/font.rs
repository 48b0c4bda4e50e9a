//! Web font download and on-disk cache.
//!
//! The renderer needs raw TrueType/OpenType bytes. Google Fonts serves a
//! stylesheet whose `src:` points at the font file, and picks the container
//! from the user agent: modern browsers get WOFF2, which the renderer cannot
//! use. Requesting the stylesheet as an old Internet Explorer gets a
//! `format('truetype')` source instead.
//!
//! Fetched fonts are kept in the cache directory as
//! `{family-with-dashes}-{weight}.ttf` and reused indefinitely. A cached file
//! that turns out to be WOFF/WOFF2 (left by an older fetch) is discarded and
//! fetched again.

use log::{info, warn};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

use crate::config::FontConfig;
use crate::http::{FetchError, HttpClient, HttpRequest};

/// User agent that makes Google Fonts answer with TrueType sources.
pub const LEGACY_USER_AGENT: &str = "Mozilla/5.0 (compatible; MSIE 10.0; Windows NT 6.1; Trident/6.0)";

/// `encodeURIComponent` reserved set.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static TRUETYPE_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src:\s*url\(([^)]+)\)\s*format\(\s*['"]truetype['"]\s*\)"#).unwrap()
});
static ANY_SRC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"src:\s*url\(([^)]+)\)").unwrap());

#[derive(Error, Debug)]
pub enum FontError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("font request failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("no font URL found in stylesheet")]
    NoFontUrl,
    #[error("downloaded font is {0}, not an embeddable TrueType/OpenType font")]
    NotEmbeddable(FontFormat),
    #[error("font data contains no usable font face")]
    NoFaces,
}

/// Container format detected from a font file's magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFormat {
    TrueType,
    OpenType,
    Collection,
    Woff,
    Woff2,
    Unknown,
}

impl FontFormat {
    pub fn sniff(bytes: &[u8]) -> Self {
        match bytes.get(..4) {
            Some([0x00, 0x01, 0x00, 0x00]) | Some(b"true") => FontFormat::TrueType,
            Some(b"OTTO") => FontFormat::OpenType,
            Some(b"ttcf") => FontFormat::Collection,
            Some(b"wOFF") => FontFormat::Woff,
            Some(b"wOF2") => FontFormat::Woff2,
            _ => FontFormat::Unknown,
        }
    }

    pub fn is_embeddable(self) -> bool {
        matches!(
            self,
            FontFormat::TrueType | FontFormat::OpenType | FontFormat::Collection
        )
    }
}

impl fmt::Display for FontFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FontFormat::TrueType => "TrueType",
            FontFormat::OpenType => "OpenType",
            FontFormat::Collection => "a font collection",
            FontFormat::Woff => "WOFF",
            FontFormat::Woff2 => "WOFF2",
            FontFormat::Unknown => "not a recognized font",
        })
    }
}

/// Font bytes ready for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontAsset {
    pub family: String,
    pub weight: u32,
    pub bytes: Vec<u8>,
}

/// `Noto Sans JP` at 700 → `Noto-Sans-JP-700.ttf`.
pub fn cache_file_name(family: &str, weight: u32) -> String {
    let family = family.split_whitespace().collect::<Vec<_>>().join("-");
    format!("{family}-{weight}.ttf")
}

/// Stylesheet URL for one family and weight.
pub fn css_url(endpoint: &str, family: &str, weight: u32) -> String {
    format!(
        "{endpoint}?family={}:wght@{weight}&display=swap",
        utf8_percent_encode(family, COMPONENT)
    )
}

/// The TrueType `src` URL of a stylesheet, else its first `src` URL.
pub fn extract_font_url(css: &str) -> Option<String> {
    let caps = match TRUETYPE_SRC.captures(css) {
        Some(caps) => caps,
        None => {
            let caps = ANY_SRC.captures(css)?;
            warn!("No TrueType source in font stylesheet, using the first source");
            caps
        }
    };
    let url = caps[1].trim().trim_matches(['"', '\'']).trim();
    (!url.is_empty()).then(|| url.to_string())
}

/// Fonts cached under one directory.
pub struct FontCache {
    dir: PathBuf,
}

impl FontCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, family: &str, weight: u32) -> PathBuf {
        self.dir.join(cache_file_name(family, weight))
    }

    /// Cached bytes, if present and embeddable.
    fn cached(&self, path: &Path) -> Option<Vec<u8>> {
        let bytes = std::fs::read(path).ok()?;
        let format = FontFormat::sniff(&bytes);
        if format.is_embeddable() {
            Some(bytes)
        } else {
            warn!(
                "Cached font {} is {format}, fetching again",
                path.display()
            );
            None
        }
    }

    /// Return the configured font, fetching it when not usable from cache.
    pub async fn load_or_fetch<C: HttpClient>(
        &self,
        client: &C,
        config: &FontConfig,
    ) -> Result<FontAsset, FontError> {
        let path = self.path_for(&config.family, config.weight);
        if let Some(bytes) = self.cached(&path) {
            info!("Using cached font: {}", path.display());
            return Ok(asset(config, bytes));
        }

        info!("Fetching font: {} (weight: {})", config.family, config.weight);
        let bytes = fetch_font(client, config).await?;

        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, &bytes)?;
        info!("Cached font: {}", path.display());
        Ok(asset(config, bytes))
    }
}

fn asset(config: &FontConfig, bytes: Vec<u8>) -> FontAsset {
    FontAsset {
        family: config.family.clone(),
        weight: config.weight,
        bytes,
    }
}

async fn get_ok<C: HttpClient>(client: &C, request: HttpRequest) -> Result<Vec<u8>, FontError> {
    let response = client.get(&request).await?;
    if !response.is_success() {
        return Err(FontError::Status {
            url: request.url,
            status: response.status,
        });
    }
    Ok(response.body)
}

/// Download the font: stylesheet first, then the file it points at.
pub async fn fetch_font<C: HttpClient>(client: &C, config: &FontConfig) -> Result<Vec<u8>, FontError> {
    let css_request = HttpRequest::get(css_url(&config.css_endpoint, &config.family, config.weight))
        .user_agent(LEGACY_USER_AGENT);
    let css = String::from_utf8_lossy(&get_ok(client, css_request).await?).into_owned();

    let font_url = extract_font_url(&css).ok_or(FontError::NoFontUrl)?;
    let bytes = get_ok(client, HttpRequest::get(font_url)).await?;

    match FontFormat::sniff(&bytes) {
        format if format.is_embeddable() => Ok(bytes),
        format => Err(FontError::NotEmbeddable(format)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs;
    use tempfile::TempDir;

    const CSS_URL: &str = "https://fonts.googleapis.com/css2?family=Noto%20Sans%20JP:wght@700&display=swap";
    const FONT_URL: &str = "https://fonts.gstatic.com/s/notosansjp/v1/font.ttf";
    const TTF: &[u8] = b"\x00\x01\x00\x00rest-of-font";

    fn stylesheet() -> String {
        format!(
            "@font-face {{\n  font-family: 'Noto Sans JP';\n  font-weight: 700;\n  src: url({FONT_URL}) format('truetype');\n}}\n"
        )
    }

    fn mock() -> MockHttp {
        MockHttp::new()
            .page(CSS_URL, &stylesheet())
            .bytes(FONT_URL, 200, TTF)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn sniffs_containers() {
        assert_eq!(FontFormat::sniff(TTF), FontFormat::TrueType);
        assert_eq!(FontFormat::sniff(b"OTTO...."), FontFormat::OpenType);
        assert_eq!(FontFormat::sniff(b"ttcf...."), FontFormat::Collection);
        assert_eq!(FontFormat::sniff(b"wOFF...."), FontFormat::Woff);
        assert_eq!(FontFormat::sniff(b"wOF2...."), FontFormat::Woff2);
        assert_eq!(FontFormat::sniff(b"<htm"), FontFormat::Unknown);
        assert_eq!(FontFormat::sniff(b"ab"), FontFormat::Unknown);
        assert!(!FontFormat::Woff2.is_embeddable());
    }

    #[test]
    fn cache_names() {
        assert_eq!(cache_file_name("Noto Sans JP", 700), "Noto-Sans-JP-700.ttf");
        assert_eq!(cache_file_name("Inter", 400), "Inter-400.ttf");
    }

    #[test]
    fn css_url_encodes_family() {
        assert_eq!(
            css_url("https://fonts.googleapis.com/css2", "Noto Sans JP", 700),
            CSS_URL
        );
    }

    #[test]
    fn prefers_truetype_source() {
        let css = "src: url(https://a/x.woff2) format('woff2');\nsrc: url(\"https://a/x.ttf\") format(\"truetype\");";
        assert_eq!(extract_font_url(css).as_deref(), Some("https://a/x.ttf"));
    }

    #[test]
    fn falls_back_to_first_source() {
        let css = "src: url('https://a/x.otf') format('opentype');";
        assert_eq!(extract_font_url(css).as_deref(), Some("https://a/x.otf"));
        assert_eq!(extract_font_url("body { color: red }"), None);
    }

    // =========================================================================
    // FontCache
    // =========================================================================

    #[tokio::test]
    async fn fetches_and_caches() {
        let tmp = TempDir::new().unwrap();
        let cache = FontCache::new(&tmp.path().join(".font-cache"));
        let http = mock();

        let font = cache.load_or_fetch(&http, &FontConfig::default()).await.unwrap();

        assert_eq!(font.bytes, TTF);
        assert_eq!(font.weight, 700);
        assert_eq!(http.requested_urls(), vec![CSS_URL, FONT_URL]);
        let css_request = &http.get_requests()[0];
        assert_eq!(css_request.user_agent.as_deref(), Some(LEGACY_USER_AGENT));
        assert_eq!(
            fs::read(tmp.path().join(".font-cache/Noto-Sans-JP-700.ttf")).unwrap(),
            TTF
        );
    }

    #[tokio::test]
    async fn cached_font_skips_network() {
        let tmp = TempDir::new().unwrap();
        let cache = FontCache::new(tmp.path());
        fs::write(cache.path_for("Noto Sans JP", 700), b"OTTOcached").unwrap();
        let http = MockHttp::new();

        let font = cache.load_or_fetch(&http, &FontConfig::default()).await.unwrap();

        assert_eq!(font.bytes, b"OTTOcached");
        assert!(http.get_requests().is_empty());
    }

    #[tokio::test]
    async fn cached_woff2_is_refetched() {
        let tmp = TempDir::new().unwrap();
        let cache = FontCache::new(tmp.path());
        let path = cache.path_for("Noto Sans JP", 700);
        fs::write(&path, b"wOF2stale").unwrap();
        let http = mock();

        let font = cache.load_or_fetch(&http, &FontConfig::default()).await.unwrap();

        assert_eq!(font.bytes, TTF);
        assert_eq!(fs::read(&path).unwrap(), TTF);
    }

    #[tokio::test]
    async fn woff2_download_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let cache = FontCache::new(tmp.path());
        let http = MockHttp::new()
            .page(CSS_URL, &stylesheet())
            .bytes(FONT_URL, 200, b"wOF2compressed");

        let result = cache.load_or_fetch(&http, &FontConfig::default()).await;

        assert!(matches!(
            result,
            Err(FontError::NotEmbeddable(FontFormat::Woff2))
        ));
        assert!(!cache.path_for("Noto Sans JP", 700).exists());
    }

    #[tokio::test]
    async fn stylesheet_error_status_fails() {
        let tmp = TempDir::new().unwrap();
        let http = MockHttp::new().bytes(CSS_URL, 400, b"bad request");

        let result = FontCache::new(tmp.path())
            .load_or_fetch(&http, &FontConfig::default())
            .await;

        assert!(matches!(result, Err(FontError::Status { status: 400, .. })));
    }

    #[tokio::test]
    async fn stylesheet_without_url_fails() {
        let tmp = TempDir::new().unwrap();
        let http = MockHttp::new().page(CSS_URL, "/* nothing */");

        let result = FontCache::new(tmp.path())
            .load_or_fetch(&http, &FontConfig::default())
            .await;

        assert!(matches!(result, Err(FontError::NoFontUrl)));
    }
}
