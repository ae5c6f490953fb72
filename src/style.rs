use anyhow::{Context, Result};
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use thiserror::Error;

use crate::monitors::Resolution;

/// How Xfce fits a wallpaper to a monitor, as stored in the `image-style`
/// property of the `xfce4-desktop` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Unscaled, centered on a black canvas.
    Centered,
    /// Repeated from the top-left corner.
    Tiled,
    /// Resized to the exact resolution, ignoring aspect ratio.
    Stretched,
    /// Aspect-preserving fit, letterboxed on black.
    Scaled,
    /// Aspect-preserving fill, center-cropped.
    Zoomed,
    /// Spans all monitors; applied per monitor it behaves like zoom.
    Spanning,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StyleError {
    #[error("unrecognized wallpaper style code {0}")]
    Unrecognized(i32),
}

impl Style {
    /// Map an `image-style` code to a style variant.
    pub fn from_code(code: i32) -> Result<Self, StyleError> {
        match code {
            1 => Ok(Self::Centered),
            2 => Ok(Self::Tiled),
            3 => Ok(Self::Stretched),
            4 => Ok(Self::Scaled),
            5 => Ok(Self::Zoomed),
            6 => Ok(Self::Spanning),
            other => Err(StyleError::Unrecognized(other)),
        }
    }

    /// Fit `image` to `target` under this style. The result always has
    /// exactly the target dimensions, so two images adapted with the same
    /// style and resolution can be blended pixel for pixel.
    pub fn apply(self, image: &DynamicImage, target: Resolution) -> Result<RgbImage> {
        match self {
            Self::Centered => center_image(image, target.width, target.height),
            Self::Tiled => tile_image(image, target.width, target.height),
            Self::Stretched => resize_image_fast(image, target.width, target.height),
            Self::Scaled => fit_image(image, target.width, target.height),
            Self::Zoomed | Self::Spanning => fill_image(image, target.width, target.height),
        }
    }
}

/// Center image without scaling
fn center_image(image: &DynamicImage, target_width: u32, target_height: u32) -> Result<RgbImage> {
    let mut output = ImageBuffer::from_pixel(target_width, target_height, Rgb([0, 0, 0]));

    let rgb_image = image.to_rgb8();
    let (img_width, img_height) = rgb_image.dimensions();

    // Signed offsets so oversized images are center-cropped.
    let x_offset = (i64::from(target_width) - i64::from(img_width)) / 2;
    let y_offset = (i64::from(target_height) - i64::from(img_height)) / 2;

    image::imageops::overlay(&mut output, &rgb_image, x_offset, y_offset);

    Ok(output)
}

/// Scale to fill entire output (may crop)
fn fill_image(image: &DynamicImage, target_width: u32, target_height: u32) -> Result<RgbImage> {
    let (img_width, img_height) = (image.width(), image.height());
    let target_ratio = target_width as f32 / target_height as f32;
    let img_ratio = img_width as f32 / img_height as f32;

    let (scale_width, scale_height) = if target_ratio > img_ratio {
        // Target is wider, scale to width
        let scale = target_width as f32 / img_width as f32;
        (target_width, (img_height as f32 * scale) as u32)
    } else {
        // Target is taller, scale to height
        let scale = target_height as f32 / img_height as f32;
        ((img_width as f32 * scale) as u32, target_height)
    };

    let resized = resize_image_fast(image, scale_width, scale_height)?;

    // Crop to target size if needed
    if scale_width != target_width || scale_height != target_height {
        let x_offset = (scale_width.saturating_sub(target_width)) / 2;
        let y_offset = (scale_height.saturating_sub(target_height)) / 2;

        Ok(
            image::imageops::crop_imm(&resized, x_offset, y_offset, target_width, target_height)
                .to_image(),
        )
    } else {
        Ok(resized)
    }
}

/// Scale to fit within output (may have letterboxing)
fn fit_image(image: &DynamicImage, target_width: u32, target_height: u32) -> Result<RgbImage> {
    let (img_width, img_height) = (image.width(), image.height());
    let target_ratio = target_width as f32 / target_height as f32;
    let img_ratio = img_width as f32 / img_height as f32;

    let (scale_width, scale_height) = if target_ratio > img_ratio {
        // Target is wider than image, scale to height
        let scale = target_height as f32 / img_height as f32;
        ((img_width as f32 * scale) as u32, target_height)
    } else {
        // Target is taller than image (or same), scale to width
        let scale = target_width as f32 / img_width as f32;
        (target_width, (img_height as f32 * scale) as u32)
    };

    let resized = resize_image_fast(image, scale_width, scale_height)?;

    // Center on black background
    let mut output = ImageBuffer::from_pixel(target_width, target_height, Rgb([0, 0, 0]));
    let x_offset = (target_width.saturating_sub(scale_width)) / 2;
    let y_offset = (target_height.saturating_sub(scale_height)) / 2;

    image::imageops::overlay(&mut output, &resized, i64::from(x_offset), i64::from(y_offset));

    Ok(output)
}

/// Tile the image
fn tile_image(image: &DynamicImage, target_width: u32, target_height: u32) -> Result<RgbImage> {
    let mut output = ImageBuffer::from_pixel(target_width, target_height, Rgb([0, 0, 0]));
    let rgb_image = image.to_rgb8();
    let (img_width, img_height) = rgb_image.dimensions();

    let tiles_x = target_width.div_ceil(img_width);
    let tiles_y = target_height.div_ceil(img_height);

    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x = tx * img_width;
            let y = ty * img_height;
            image::imageops::overlay(&mut output, &rgb_image, i64::from(x), i64::from(y));
        }
    }

    Ok(output)
}

/// Fast image resizing using fast_image_resize
fn resize_image_fast(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbImage> {
    use fast_image_resize as fr;

    let src_image = image.to_rgb8();
    let (src_width, src_height) = src_image.dimensions();

    let src = fr::images::Image::from_vec_u8(
        TryInto::try_into(src_width)?,
        TryInto::try_into(src_height)?,
        src_image.into_raw(),
        fr::PixelType::U8x3,
    )
    .context("Failed to create source image")?;

    let mut dst = fr::images::Image::new(
        TryInto::try_into(target_width)?,
        TryInto::try_into(target_height)?,
        fr::PixelType::U8x3,
    );

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(
            &src,
            &mut dst,
            &fr::ResizeOptions::new()
                .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3)),
        )
        .context("Failed to resize image")?;

    ImageBuffer::from_raw(target_width, target_height, dst.into_vec())
        .context("Failed to create output image buffer")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, pixel: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb(pixel)))
    }

    const TARGET: Resolution = Resolution {
        width: 64,
        height: 48,
    };

    #[test]
    fn test_from_code() {
        assert_eq!(Style::from_code(1), Ok(Style::Centered));
        assert_eq!(Style::from_code(2), Ok(Style::Tiled));
        assert_eq!(Style::from_code(3), Ok(Style::Stretched));
        assert_eq!(Style::from_code(4), Ok(Style::Scaled));
        assert_eq!(Style::from_code(5), Ok(Style::Zoomed));
        assert_eq!(Style::from_code(6), Ok(Style::Spanning));
        assert_eq!(Style::from_code(0), Err(StyleError::Unrecognized(0)));
        assert_eq!(Style::from_code(7), Err(StyleError::Unrecognized(7)));
        assert_eq!(Style::from_code(-1), Err(StyleError::Unrecognized(-1)));
    }

    #[test]
    fn test_every_style_matches_target_dimensions() {
        let small = solid(20, 30, [10, 20, 30]);
        let large = solid(200, 100, [10, 20, 30]);

        for style in [
            Style::Centered,
            Style::Tiled,
            Style::Stretched,
            Style::Scaled,
            Style::Zoomed,
            Style::Spanning,
        ] {
            for input in [&small, &large] {
                let out = style.apply(input, TARGET).unwrap();
                assert_eq!(out.dimensions(), (TARGET.width, TARGET.height));
            }
        }
    }

    #[test]
    fn test_centered_letterboxes_small_image() {
        let out = Style::Centered
            .apply(&solid(16, 16, [255, 0, 0]), TARGET)
            .unwrap();

        // Image sits in the middle, canvas stays black around it.
        assert_eq!(out.get_pixel(32, 24), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(63, 47), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_tiled_covers_canvas() {
        let out = Style::Tiled
            .apply(&solid(10, 10, [0, 255, 0]), TARGET)
            .unwrap();

        // Tiling leaves no background visible anywhere.
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 255, 0]));
        assert_eq!(out.get_pixel(63, 47), &Rgb([0, 255, 0]));
    }

    #[test]
    fn test_scaled_preserves_aspect_with_letterbox() {
        // 1:1 image into a 4:3 target: bars on the left and right.
        let out = Style::Scaled
            .apply(&solid(100, 100, [0, 0, 255]), TARGET)
            .unwrap();

        assert_eq!(out.get_pixel(32, 24), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(0, 24), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(63, 24), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_zoomed_fills_canvas() {
        let out = Style::Zoomed
            .apply(&solid(100, 100, [7, 7, 7]), TARGET)
            .unwrap();

        // Fill crops instead of letterboxing, so the corners carry the image.
        assert_eq!(out.get_pixel(0, 0), &Rgb([7, 7, 7]));
        assert_eq!(out.get_pixel(63, 47), &Rgb([7, 7, 7]));
    }
}
