//! Project configuration module.
//!
//! Handles loading, validating, and merging the `blog-prep.toml` file. Stock
//! defaults describe the standard blog layout; a config file only needs the
//! keys it wants to change.
//!
//! ## Config File Location
//!
//! The file lives at the project root (`--root`), next to the content and
//! build directories it points at. Every path inside it is relative to that
//! root:
//!
//! ```text
//! project/
//! ├── blog-prep.toml
//! ├── src/content/blog/        # content_dir
//! ├── src/assets/ogp/          # ogp_images.base_image
//! ├── public/ogp/blog/         # ogp_images.output_dir
//! └── dist/analog/public/blog/ # raw_markdown.output_dir
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_dir = "src/content/blog"
//!
//! [raw_markdown]
//! build_dir = "dist/analog/public"        # Must exist before the copy runs
//! output_dir = "dist/analog/public/blog"  # Receives {slug}.md
//!
//! [link_cards]
//! cache_file = ".ogp-cache.json"
//! ttl_hours = 24
//! timeout_secs = 10
//! user_agent = "Mozilla/5.0 (compatible; OGPFetcher/1.0; +https://nekorush14.dev)"
//! accept_language = "ja,en;q=0.5"
//!
//! [ogp_images]
//! output_dir = "public/ogp/blog"
//! base_image = "src/assets/ogp/blog-ogp-base.svg"
//! site_name = "nekorush14.dev"
//!
//! [ogp_images.font]
//! family = "Noto Sans JP"
//! weight = 700
//! cache_dir = ".font-cache"
//! css_endpoint = "https://fonts.googleapis.com/css2"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up under the project root.
pub const CONFIG_FILENAME: &str = "blog-prep.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Project configuration loaded from `blog-prep.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory holding the Markdown posts.
    pub content_dir: String,
    /// Raw Markdown export settings.
    pub raw_markdown: RawMarkdownConfig,
    /// Link-card enrichment settings.
    pub link_cards: LinkCardsConfig,
    /// OGP image generation settings.
    pub ogp_images: OgpImagesConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: "src/content/blog".to_string(),
            raw_markdown: RawMarkdownConfig::default(),
            link_cards: LinkCardsConfig::default(),
            ogp_images: OgpImagesConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "content_dir must not be empty".into(),
            ));
        }
        if self.link_cards.ttl_hours == 0 {
            return Err(ConfigError::Validation(
                "link_cards.ttl_hours must be greater than 0".into(),
            ));
        }
        if self.link_cards.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "link_cards.timeout_secs must be greater than 0".into(),
            ));
        }
        let weight = self.ogp_images.font.weight;
        if !(100..=900).contains(&weight) || weight % 100 != 0 {
            return Err(ConfigError::Validation(
                "ogp_images.font.weight must be a multiple of 100 between 100 and 900".into(),
            ));
        }
        if self.ogp_images.font.family.trim().is_empty() {
            return Err(ConfigError::Validation(
                "ogp_images.font.family must not be empty".into(),
            ));
        }
        if self.ogp_images.site_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "ogp_images.site_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Raw Markdown export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawMarkdownConfig {
    /// Build output directory produced by the site build. The copy refuses
    /// to run when it is missing.
    pub build_dir: String,
    /// Where `{slug}.md` copies are written.
    pub output_dir: String,
}

impl Default for RawMarkdownConfig {
    fn default() -> Self {
        Self {
            build_dir: "dist/analog/public".to_string(),
            output_dir: "dist/analog/public/blog".to_string(),
        }
    }
}

/// Link-card enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkCardsConfig {
    /// JSON cache of fetched Open Graph records.
    pub cache_file: String,
    /// Age after which a cached record is fetched again.
    pub ttl_hours: u64,
    /// Per-request timeout for page fetches.
    pub timeout_secs: u64,
    /// User agent sent with page fetches.
    pub user_agent: String,
    /// `Accept-Language` sent with page fetches.
    pub accept_language: String,
}

impl Default for LinkCardsConfig {
    fn default() -> Self {
        Self {
            cache_file: ".ogp-cache.json".to_string(),
            ttl_hours: 24,
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (compatible; OGPFetcher/1.0; +https://nekorush14.dev)"
                .to_string(),
            accept_language: "ja,en;q=0.5".to_string(),
        }
    }
}

impl LinkCardsConfig {
    /// TTL in milliseconds, the unit `fetchedAt` is stored in.
    pub fn ttl_millis(&self) -> i64 {
        (self.ttl_hours as i64).saturating_mul(60 * 60 * 1000)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// OGP image generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OgpImagesConfig {
    /// Where `{slug}.png` files are written.
    pub output_dir: String,
    /// Pre-rendered 1200×630 background (SVG, PNG, JPEG or WebP).
    pub base_image: String,
    /// Constant site name printed at the bottom of every image.
    pub site_name: String,
    /// Font used for every text overlay.
    pub font: FontConfig,
}

impl Default for OgpImagesConfig {
    fn default() -> Self {
        Self {
            output_dir: "public/ogp/blog".to_string(),
            base_image: "src/assets/ogp/blog-ogp-base.svg".to_string(),
            site_name: "nekorush14.dev".to_string(),
            font: FontConfig::default(),
        }
    }
}

/// Web font settings for OGP images.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontConfig {
    /// Font family as known to the CSS endpoint.
    pub family: String,
    /// Font weight (100–900).
    pub weight: u32,
    /// Directory holding downloaded font files.
    pub cache_dir: String,
    /// CSS endpoint that lists font sources for a family/weight.
    pub css_endpoint: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "Noto Sans JP".to_string(),
            weight: 700,
            cache_dir: ".font-cache".to_string(),
            css_endpoint: "https://fonts.googleapis.com/css2".to_string(),
        }
    }
}

/// A [`SiteConfig`] with every path resolved against the project root.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub content_dir: PathBuf,
    pub raw_build_dir: PathBuf,
    pub raw_output_dir: PathBuf,
    pub link_card_cache: PathBuf,
    pub ogp_output_dir: PathBuf,
    pub ogp_base_image: PathBuf,
    pub font_cache_dir: PathBuf,
}

impl ProjectPaths {
    pub fn resolve(root: &Path, config: &SiteConfig) -> Self {
        Self {
            content_dir: root.join(&config.content_dir),
            raw_build_dir: root.join(&config.raw_markdown.build_dir),
            raw_output_dir: root.join(&config.raw_markdown.output_dir),
            link_card_cache: root.join(&config.link_cards.cache_file),
            ogp_output_dir: root.join(&config.ogp_images.output_dir),
            ogp_base_image: root.join(&config.ogp_images.base_image),
            font_cache_dir: root.join(&config.ogp_images.font.cache_dir),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `config_path`, falling back to stock defaults
/// when it does not exist.
pub fn load_config(config_path: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(load_raw_config(config_path)?)
}

/// Load a config file that must exist.
///
/// Used for a path given explicitly on the command line, where falling back
/// to the stock defaults would hide a typo.
pub fn load_required_config(config_path: &Path) -> Result<SiteConfig, ConfigError> {
    if !config_path.is_file() {
        return Err(ConfigError::NotFound(config_path.to_path_buf()));
    }
    load_config(config_path)
}

/// Returns a fully-commented stock `blog-prep.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# blog-prep configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Paths are relative to the project root.
# Unknown keys will cause an error.

# Directory containing the Markdown posts (one file per post).
content_dir = "src/content/blog"

# ---------------------------------------------------------------------------
# Raw Markdown export (run after the site build)
# ---------------------------------------------------------------------------
[raw_markdown]
# Build output directory. The export refuses to run if it does not exist.
build_dir = "dist/analog/public"

# Each post is copied verbatim to {output_dir}/{slug}.md
output_dir = "dist/analog/public/blog"

# ---------------------------------------------------------------------------
# Link cards (run before the site build; rewrites posts in place)
# ---------------------------------------------------------------------------
[link_cards]
# JSON cache of fetched Open Graph metadata, keyed by URL.
cache_file = ".ogp-cache.json"

# Cached records older than this are fetched again.
ttl_hours = 24

# Timeout for each page fetch.
timeout_secs = 10

# Identifying user agent for page fetches.
user_agent = "Mozilla/5.0 (compatible; OGPFetcher/1.0; +https://nekorush14.dev)"

accept_language = "ja,en;q=0.5"

# ---------------------------------------------------------------------------
# OGP images (run before the site build)
# ---------------------------------------------------------------------------
[ogp_images]
# Each post with a title and slug produces {output_dir}/{slug}.png
output_dir = "public/ogp/blog"

# 1200x630 background: SVG, PNG, JPEG or WebP.
base_image = "src/assets/ogp/blog-ogp-base.svg"

# Printed at the bottom of every image.
site_name = "nekorush14.dev"

[ogp_images.font]
family = "Noto Sans JP"
weight = 700

# Downloaded fonts are kept here between runs.
cache_dir = ".font-cache"

# CSS endpoint listing font sources (Google Fonts CSS API v2).
css_endpoint = "https://fonts.googleapis.com/css2"
"##
}
