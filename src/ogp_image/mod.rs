//! OGP image generator.
//!
//! Produces one 1200×630 PNG per post, `{output_dir}/{slug}.png`, for use as
//! the page's `og:image`.
//!
//! ## Pipeline
//!
//! ```text
//! front matter ──► OgpImageSpec ──► LayoutTree ──► SVG ──► resvg ──► PNG
//!                                       ▲                    ▲
//!                         base image (data URI)         web font bytes
//! ```
//!
//! - [`layout`]: positions and styles of the background and text blocks.
//! - [`svg`]: text wrapping and SVG serialization.
//! - [`raster`]: rasterization with the fetched font registered.
//! - [`font`]: web font download and cache.
//! - [`cache`]: render manifest that skips unchanged posts.
//!
//! ## Failure handling
//!
//! A missing content directory, an unreadable or unsupported base image, or a
//! failed font download aborts the run before any image is written. Posts
//! without a title or slug are skipped; a post that fails to render is
//! recorded as failed and the run continues.

pub mod cache;
pub mod font;
pub mod layout;
pub mod raster;
pub mod svg;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{OgpImagesConfig, ProjectPaths};
use crate::content::{self, ContentFile, SkipReason, Skipped};
use crate::front_matter;
use crate::http::HttpClient;
use cache::{CacheStats, RenderManifest, hash_assets, hash_render};
use font::{FontAsset, FontCache, FontError};
use layout::{HEIGHT, OgpImageSpec, WIDTH, build_layout};
use raster::{Rasterizer, RenderError};

#[derive(Error, Debug)]
pub enum OgpImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Content directory not found: {0}")]
    ContentDirMissing(PathBuf),
    #[error("Base image not found: {0}")]
    BaseImageMissing(PathBuf),
    #[error("Unsupported base image format: {0} (expected SVG, PNG, JPEG or WebP)")]
    UnsupportedBaseImage(PathBuf),
    #[error("Font error: {0}")]
    Font(#[from] FontError),
}

/// The card background, embedded into every SVG as a data URI.
#[derive(Debug, Clone)]
pub struct Background {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Background {
    /// Read the base image and detect its format from content.
    ///
    /// Raster images not sized 1200×630 are accepted with a warning; they are
    /// stretched to the canvas.
    pub fn load(path: &Path) -> Result<Self, OgpImageError> {
        let bytes = std::fs::read(path)
            .map_err(|_| OgpImageError::BaseImageMissing(path.to_path_buf()))?;
        let mime = detect_mime(&bytes)
            .ok_or_else(|| OgpImageError::UnsupportedBaseImage(path.to_path_buf()))?;

        if mime != "image/svg+xml"
            && let Ok(size) = image::ImageReader::new(std::io::Cursor::new(&bytes))
                .with_guessed_format()
                .map_err(image::ImageError::IoError)
                .and_then(|reader| reader.into_dimensions())
            && size != (WIDTH, HEIGHT)
        {
            warn!(
                "Base image {} is {}x{}, expected {WIDTH}x{HEIGHT}; it will be stretched",
                path.display(),
                size.0,
                size.1
            );
        }

        Ok(Self { mime, bytes })
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

fn detect_mime(bytes: &[u8]) -> Option<&'static str> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("<svg") || (head.starts_with('<') && head.contains("<svg")) {
        return Some("image/svg+xml");
    }
    match image::guess_format(bytes).ok()? {
        image::ImageFormat::Png => Some("image/png"),
        image::ImageFormat::Jpeg => Some("image/jpeg"),
        image::ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

/// Everything shared by all renders of one run.
pub struct RenderContext {
    background_uri: String,
    site_name: String,
    family: String,
    assets_hash: String,
    rasterizer: Rasterizer,
}

impl RenderContext {
    /// Fails when the font bytes hold no usable face.
    pub fn new(
        background: &Background,
        font: &FontAsset,
        site_name: &str,
    ) -> Result<Self, FontError> {
        let rasterizer = Rasterizer::new(&font.bytes)?;
        if rasterizer.family() != font.family {
            info!(
                "Font requested as {} declares family {}",
                font.family,
                rasterizer.family()
            );
        }
        Ok(Self {
            background_uri: background.data_uri(),
            site_name: site_name.to_string(),
            family: rasterizer.family().to_string(),
            assets_hash: hash_assets(&background.bytes, &font.bytes),
            rasterizer,
        })
    }

    pub fn render_hash(&self, spec: &OgpImageSpec) -> String {
        hash_render(spec, &self.site_name, &self.assets_hash)
    }

    pub fn render_svg(&self, spec: &OgpImageSpec) -> String {
        let tree = build_layout(spec, &self.background_uri, &self.site_name);
        svg::render_svg(&tree, &self.family)
    }

    pub fn render_png(&self, spec: &OgpImageSpec) -> Result<Vec<u8>, RenderError> {
        self.rasterizer.render_png(&self.render_svg(spec))
    }
}

/// A post whose image could not be produced.
#[derive(Debug)]
pub struct Failed {
    pub file: String,
    pub slug: String,
    pub error: String,
}

/// Outcome of a generator run.
#[derive(Debug, Default)]
pub struct OgpImageReport {
    /// Slugs with an up-to-date image, rendered or cached.
    pub generated: Vec<String>,
    pub cache: CacheStats,
    pub skipped: Vec<Skipped>,
    pub failed: Vec<Failed>,
}

/// Render an image for every post in `content_dir` into `output_dir`.
pub fn generate(
    content_dir: &Path,
    output_dir: &Path,
    context: &RenderContext,
    no_cache: bool,
) -> Result<OgpImageReport, OgpImageError> {
    if !content_dir.is_dir() {
        return Err(OgpImageError::ContentDirMissing(content_dir.to_path_buf()));
    }
    let files = content::list_markdown_files(content_dir)?;
    let mut report = OgpImageReport::default();
    if files.is_empty() {
        info!("No Markdown files found in {}", content_dir.display());
        return Ok(report);
    }
    info!("Found {} blog post(s)", files.len());

    std::fs::create_dir_all(output_dir)?;
    let mut manifest = if no_cache {
        RenderManifest::empty()
    } else {
        RenderManifest::load(output_dir)
    };

    for path in &files {
        let post = match ContentFile::read(path) {
            Ok(post) => post,
            Err(e) => {
                skip(&mut report, path, SkipReason::Unreadable(e.to_string()));
                continue;
            }
        };
        let spec = match front_matter::parse(&post.raw)
            .map_err(SkipReason::FrontMatter)
            .and_then(|fm| OgpImageSpec::from_front_matter(&fm))
        {
            Ok(spec) => spec,
            Err(reason) => {
                skip(&mut report, path, reason);
                continue;
            }
        };

        let hash = context.render_hash(&spec);
        if manifest.is_current(&spec.slug, &hash, output_dir) {
            debug!("Up to date: {}", spec.file_name());
            report.cache.hit();
            report.generated.push(spec.slug);
            continue;
        }

        info!("Generating: {}", spec.file_name());
        let written = context
            .render_png(&spec)
            .map_err(|e| e.to_string())
            .and_then(|png| {
                std::fs::write(output_dir.join(spec.file_name()), png).map_err(|e| e.to_string())
            });
        match written {
            Ok(()) => {
                report.cache.miss();
                manifest.insert(spec.slug.clone(), hash);
                report.generated.push(spec.slug);
            }
            Err(error) => {
                warn!("Error generating {}: {error}", spec.file_name());
                report.failed.push(Failed {
                    file: post.file_name,
                    slug: spec.slug,
                    error,
                });
            }
        }
    }

    // Only slugs produced by this run stay in the manifest
    manifest.retain_slugs(&report.generated);
    manifest.save(output_dir)?;
    Ok(report)
}

/// Load the base image and font, then [`generate`].
pub async fn prebuild_ogp_images<C: HttpClient>(
    paths: &ProjectPaths,
    config: &OgpImagesConfig,
    client: &C,
    no_cache: bool,
) -> Result<OgpImageReport, OgpImageError> {
    if !paths.content_dir.is_dir() {
        return Err(OgpImageError::ContentDirMissing(paths.content_dir.clone()));
    }
    let background = Background::load(&paths.ogp_base_image)?;
    let font = FontCache::new(&paths.font_cache_dir)
        .load_or_fetch(client, &config.font)
        .await?;

    let context = RenderContext::new(&background, &font, &config.site_name)?;
    generate(&paths.content_dir, &paths.ogp_output_dir, &context, no_cache)
}

fn skip(report: &mut OgpImageReport, path: &Path, reason: SkipReason) {
    let file = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    warn!("Skipping {file}: {reason}");
    report.skipped.push(Skipped { file, reason });
}
