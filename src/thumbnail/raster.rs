//! SVG to PNG rendering through resvg.

use std::path::Path;

use resvg::{tiny_skia, usvg};

use crate::error::{ThumbnailError, ThumbnailResult};

/// Render SVG markup at its intrinsic size and save it as PNG at `out`.
pub fn rasterize(svg: &[u8], out: &Path) -> ThumbnailResult<()> {
    let raster_error = |message: String| ThumbnailError::Raster {
        path: out.display().to_string(),
        message,
    };

    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_data(svg, &options).map_err(|e| raster_error(e.to_string()))?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| raster_error(format!("zero-sized canvas {}x{}", size.width(), size.height())))?;

    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    pixmap.save_png(out).map_err(|e| raster_error(e.to_string()))?;
    tracing::debug!(path = %out.display(), width = size.width(), height = size.height(), "rasterized cover");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_png_at_intrinsic_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("cover.png");
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="3"><rect width="4" height="3" style="fill:red;"/></svg>"#;

        rasterize(svg, &out).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let pixmap = tiny_skia::Pixmap::load_png(&out).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (4, 3));
        let pixel = pixmap.pixel(1, 1).unwrap();
        assert_eq!((pixel.red(), pixel.green(), pixel.blue()), (255, 0, 0));
    }

    #[test]
    fn invalid_markup_is_a_raster_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = rasterize(b"<html/>", &dir.path().join("x.png")).unwrap_err();
        assert!(matches!(err, ThumbnailError::Raster { .. }));
    }
}
