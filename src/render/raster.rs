use std::path::Path;
use std::sync::Arc;

use resvg::usvg::{self, fontdb};
use tiny_skia::{Pixmap, Transform};

use crate::error::{ChartError, ChartResult};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Turns SVG documents into PNG bytes. The font database is loaded once and
/// shared by every render.
#[derive(Clone)]
pub struct Rasterizer {
    fontdb: Arc<fontdb::Database>,
}

impl Rasterizer {
    /// System fonts plus anything in `./fonts`.
    pub fn new() -> Self {
        Self::with_fonts_dir(Path::new("fonts"))
    }

    pub fn with_fonts_dir(dir: &Path) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if dir.is_dir() {
            db.load_fonts_dir(dir);
        }
        configure_font_fallbacks(&mut db);
        tracing::debug!(faces = db.len(), "font database loaded");
        Self {
            fontdb: Arc::new(db),
        }
    }

    pub fn face_count(&self) -> usize {
        self.fontdb.len()
    }

    pub fn png(&self, svg: &str) -> ChartResult<Vec<u8>> {
        let mut opts = usvg::Options::default();
        opts.fontdb = Arc::clone(&self.fontdb);

        let tree = usvg::Tree::from_str(svg, &opts)
            .map_err(|e| ChartError::render(format!("Failed to parse SVG: {}", e)))?;

        let width = tree.size().width().ceil() as u32;
        let height = tree.size().height().ceil() as u32;
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| ChartError::render(format!("Cannot allocate {}x{} image", width, height)))?;

        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|e| ChartError::render(format!("Failed to encode PNG: {}", e)))
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

/// True when `bytes` start with the PNG file signature.
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

fn configure_font_fallbacks(fontdb: &mut fontdb::Database) {
    let mut sans_family: Option<String> = None;
    let mut serif_family: Option<String> = None;
    let mut first_family: Option<String> = None;

    for face in fontdb.faces() {
        for (family, _) in &face.families {
            if first_family.is_none() {
                first_family = Some(family.clone());
            }

            let lower = family.to_ascii_lowercase();
            if sans_family.is_none() && lower.contains("sans") {
                sans_family = Some(family.clone());
            }
            if serif_family.is_none() && lower.contains("serif") && !lower.contains("sans") {
                serif_family = Some(family.clone());
            }
        }
    }

    if let Some(family) = sans_family.as_deref().or(first_family.as_deref()) {
        fontdb.set_sans_serif_family(family);
    }
    if let Some(family) = serif_family
        .as_deref()
        .or(sans_family.as_deref())
        .or(first_family.as_deref())
    {
        fontdb.set_serif_family(family);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_shapes_rasterize_without_fonts() {
        let rasterizer = Rasterizer {
            fontdb: Arc::new(fontdb::Database::new()),
        };
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20"><rect width="40" height="20" fill="#ff0000"/></svg>"##;
        let png = rasterizer.png(svg).unwrap();
        assert!(is_png(&png));
    }

    #[test]
    fn broken_svg_is_a_render_error() {
        let rasterizer = Rasterizer {
            fontdb: Arc::new(fontdb::Database::new()),
        };
        let err = rasterizer.png("<svg").unwrap_err();
        assert!(matches!(err, ChartError::Render(_)));
    }
}
