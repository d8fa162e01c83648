use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use image::RgbImage;

use crate::types::Frame;

/// Bilinear rescale of an RGB image to exactly `width` x `height`.
pub fn resize_rgb(image: &RgbImage, width: u32, height: u32) -> Result<RgbImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(anyhow!(
            "cannot resize an empty {}x{} image",
            image.width(),
            image.height()
        ));
    }

    let src_image = fir::images::Image::from_vec_u8(
        image.width(),
        image.height(),
        image.as_raw().clone(),
        fir::PixelType::U8x3,
    )?;
    let mut dst_image = fir::images::Image::new(width, height, fir::PixelType::U8x3);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;

    RgbImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| anyhow!("resized buffer does not match {width}x{height}"))
}

/// Brings a decoded frame to the declared stream size. Frames that already
/// match are returned untouched.
pub fn conform(frame: Frame, width: u32, height: u32) -> Result<Frame> {
    if frame.width() == width && frame.height() == height {
        return Ok(frame);
    }

    log::warn!(
        "frame {} size mismatch: resizing from {}x{} to {width}x{height}",
        frame.index,
        frame.width(),
        frame.height()
    );
    let image = resize_rgb(&frame.image, width, height)?;
    Ok(Frame::new(frame.index, image))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_frames_pass_through() {
        let image = RgbImage::from_pixel(8, 6, image::Rgb([10, 20, 30]));
        let frame = conform(Frame::new(3, image.clone()), 8, 6).unwrap();
        assert_eq!(frame.index, 3);
        assert_eq!(frame.image, image);
    }

    #[test]
    fn mismatched_frames_are_rescaled() {
        let image = RgbImage::from_pixel(16, 10, image::Rgb([200, 100, 50]));
        let frame = conform(Frame::new(7, image), 8, 6).unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 6));
        assert_eq!(frame.index, 7);
        // Uniform colour survives bilinear filtering.
        let px = frame.image.get_pixel(4, 3).0;
        for (got, want) in px.iter().zip([200u8, 100, 50]) {
            assert!(got.abs_diff(want) <= 1, "{px:?}");
        }
    }

    #[test]
    fn empty_images_are_rejected() {
        let image = RgbImage::new(0, 0);
        assert!(resize_rgb(&image, 4, 4).is_err());
    }
}
