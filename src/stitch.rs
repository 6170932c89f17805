//! Compositor: stitches captured tiles into one seamless page image
//!
//! Captured tiles arrive in logical (CSS) pixel coordinates but their rasters
//! are scaled by the device pixel ratio of the capturing surface. The first
//! tile's pixel height against the logical viewport height gives the scale,
//! which is uniform for the whole session (the pixel ratio cannot change
//! mid-capture). Every logical quantity is converted through that scale
//! before drawing.

use crate::walker::{PageGeometry, Tile};
use crate::{Error, Result};
use image::{imageops, RgbaImage};
use log::debug;
use std::io::Cursor;

/// Composite an ordered tile sequence into one PNG covering
/// `[0, scroll_height)` exactly once.
///
/// Non-final tiles are drawn whole at their scaled scroll offset. The final
/// tile may overlap its predecessor when the last scroll target was clamped
/// to the document end; its overlapping top rows are cropped and the
/// remainder is anchored flush against the bottom of the canvas, so no row is
/// drawn twice and the bottom edge lands exactly on `scroll_height`.
///
/// Fails with [`Error::DecodeError`] if any tile's raster cannot be decoded;
/// a corrupt tile cannot be approximated, so the whole stitch aborts.
pub fn stitch(tiles: &[Tile], geometry: &PageGeometry) -> Result<Vec<u8>> {
    let first = tiles.first().ok_or(Error::EmptyResult)?;
    if geometry.viewport_height == 0 {
        return Err(Error::StitchError("viewport height is zero".into()));
    }

    let first_image = decode_tile(first)?;
    let tile_width = first_image.width();
    let scale = f64::from(first_image.height()) / f64::from(geometry.viewport_height);
    let canvas_height = (f64::from(geometry.scroll_height) * scale).round() as u32;

    let mut canvas = RgbaImage::new(tile_width, canvas_height);
    debug!(
        "canvas {}x{}, scale {:.3}",
        tile_width, canvas_height, scale
    );

    let mut first_image = Some(first_image);
    for tile in tiles {
        let decoded = match first_image.take() {
            Some(image) => image,
            None => decode_tile(tile)?,
        };

        if tile.is_final {
            let crop = ((f64::from(tile.overlap_offset) * scale).round() as u32)
                .min(decoded.height());
            let draw_height = decoded.height() - crop;
            let dest_y = canvas_height.saturating_sub(draw_height);
            let visible =
                imageops::crop_imm(&decoded, 0, crop, decoded.width(), draw_height).to_image();
            debug!(
                "tile at scroll {}: final, cropped {} rows, dest y {}",
                tile.logical_scroll_y, crop, dest_y
            );
            imageops::replace(&mut canvas, &visible, 0, i64::from(dest_y));
        } else {
            let dest_y = (f64::from(tile.logical_scroll_y) * scale).round() as i64;
            debug!("tile at scroll {}: dest y {}", tile.logical_scroll_y, dest_y);
            imageops::replace(&mut canvas, &decoded, 0, dest_y);
        }
    }

    encode_png(&canvas)
}

fn decode_tile(tile: &Tile) -> Result<RgbaImage> {
    let bytes = tile.image.to_bytes()?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| {
        Error::DecodeError(format!("tile at scroll {}: {}", tile.logical_scroll_y, e))
    })?;
    Ok(decoded.to_rgba8())
}

fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    canvas
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| Error::StitchError(format!("PNG encode failed: {}", e)))?;
    Ok(out.into_inner())
}
