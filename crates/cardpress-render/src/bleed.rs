//! Print bleed for rasterised cards.
//!
//! Printers trim cards slightly inside the intended edge, so each side is
//! extended by `bleed` pixels. The new margin repeats the outermost row or
//! column of the original image; corners take the corner pixel.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::raster::RasterError;

/// Largest width or height a bled image may have.
pub const MAX_BLEED_SIDE: u32 = 32_768;

/// Extends a PNG by `bleed` pixels on every side.
///
/// The result is `width + 2 * bleed` by `height + 2 * bleed`. A bleed of 0
/// returns the input unchanged. Results wider or taller than
/// [`MAX_BLEED_SIDE`] are rejected with [`RasterError::BleedTooLarge`].
pub fn add_bleed(png: &[u8], bleed: u32) -> Result<Vec<u8>, RasterError> {
    if bleed == 0 {
        return Ok(png.to_vec());
    }

    let source = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_rgba8();
    let (width, height) = bled_dimensions(source.dimensions(), bleed)?;
    let extended = extend_edges(&source, bleed, width, height);

    let mut out = Cursor::new(Vec::new());
    extended.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

fn bled_dimensions((width, height): (u32, u32), bleed: u32) -> Result<(u32, u32), RasterError> {
    let grow = |side: u32| {
        bleed
            .checked_mul(2)
            .and_then(|margin| side.checked_add(margin))
            .filter(|total| *total <= MAX_BLEED_SIDE)
    };
    match (grow(width), grow(height)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(RasterError::BleedTooLarge { bleed, width, height }),
    }
}

/// Clamps every target coordinate back into the source image.
fn extend_edges(source: &RgbaImage, bleed: u32, out_width: u32, out_height: u32) -> RgbaImage {
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return source.clone();
    }
    RgbaImage::from_fn(out_width, out_height, |x, y| {
        let sx = x.saturating_sub(bleed).min(width - 1);
        let sy = y.saturating_sub(bleed).min(height - 1);
        *source.get_pixel(sx, sy)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn encode(img: &RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn decode(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().to_rgba8()
    }

    #[test]
    fn zero_bleed_is_identity() {
        let png = encode(&RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])));
        assert_eq!(add_bleed(&png, 0).unwrap(), png);
    }

    #[test]
    fn dimensions_grow_on_all_sides() {
        let png = encode(&RgbaImage::from_pixel(20, 30, Rgba([0, 0, 0, 255])));
        let out = decode(&add_bleed(&png, 11).unwrap());
        assert_eq!(out.dimensions(), (42, 52));
    }

    #[test]
    fn oversized_bleed_is_an_error() {
        let png = encode(&RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        let err = add_bleed(&png, 3_000_000_000).unwrap_err();
        assert!(matches!(
            err,
            RasterError::BleedTooLarge { bleed: 3_000_000_000, width: 2, height: 2 }
        ));
        assert!(matches!(
            add_bleed(&png, MAX_BLEED_SIDE / 2),
            Err(RasterError::BleedTooLarge { .. })
        ));
    }

    #[test]
    fn edges_and_corners_are_replicated() {
        // 2x2 image with a distinct colour per pixel.
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        img.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        img.put_pixel(1, 1, Rgba([9, 9, 9, 255]));

        let out = decode(&add_bleed(&encode(&img), 2).unwrap());
        assert_eq!(out.dimensions(), (6, 6));

        // Corners extend the corner pixels.
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(5, 0), &Rgba([0, 255, 0, 255]));
        assert_eq!(out.get_pixel(0, 5), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(5, 5), &Rgba([9, 9, 9, 255]));

        // Top margin repeats the first row, column by column.
        assert_eq!(out.get_pixel(2, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(3, 1), &Rgba([0, 255, 0, 255]));

        // The original sits at the offset.
        assert_eq!(out.get_pixel(3, 3), &Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn invalid_png_is_an_error() {
        assert!(add_bleed(b"not a png", 3).is_err());
    }
}
