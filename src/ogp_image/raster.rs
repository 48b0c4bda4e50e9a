//! SVG → PNG rasterization with `resvg`.

use log::debug;
use resvg::{tiny_skia, usvg};
use thiserror::Error;

use super::font::FontError;
use super::layout::{HEIGHT, WIDTH};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("SVG parse error: {0}")]
    Svg(#[from] usvg::Error),
    #[error("failed to allocate a {0}x{1} pixmap")]
    Pixmap(u32, u32),
    #[error("PNG encode error: {0}")]
    Png(String),
}

/// Renders SVG documents to 1200×630 PNGs with one registered font.
///
/// The font database starts empty, so output does not depend on the fonts
/// installed on the build machine. Text is drawn in the family the font file
/// itself declares, whatever name it was requested under.
pub struct Rasterizer {
    options: usvg::Options<'static>,
    family: String,
}

impl Rasterizer {
    /// Register `font` as the only font. Fails if it yields no face.
    pub fn new(font: &[u8]) -> Result<Self, FontError> {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_font_data(font.to_vec());

        let family = options
            .fontdb
            .faces()
            .find_map(|face| face.families.first())
            .map(|(name, _)| name.clone())
            .ok_or(FontError::NoFaces)?;
        options.font_family = family.clone();
        debug!(
            "Registered font family {family} ({} face(s))",
            options.fontdb.len()
        );

        Ok(Self { options, family })
    }

    /// Family name of the registered font, as used in `font-family`.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Rasterize `svg`, scaled so its width fills the canvas.
    pub fn render_png(&self, svg: &str) -> Result<Vec<u8>, RenderError> {
        let tree = usvg::Tree::from_str(svg, &self.options)?;
        let mut pixmap =
            tiny_skia::Pixmap::new(WIDTH, HEIGHT).ok_or(RenderError::Pixmap(WIDTH, HEIGHT))?;

        let scale = WIDTH as f32 / tree.size().width();
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );

        pixmap
            .encode_png()
            .map_err(|e| RenderError::Png(e.to_string()))
    }
}
