use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;

use crate::types::{Frame, Landmark};

pub const INPUT_SIZE: u32 = 256;
/// 33 body landmarks followed by 6 auxiliary ROI points.
pub const NUM_LANDMARKS: usize = 39;
/// x, y, z, visibility, presence.
pub const LANDMARK_STRIDE: usize = 5;

#[derive(Clone, Debug)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

pub fn prepare_frame(frame: &Frame) -> Result<(Array4<f32>, LetterboxInfo)> {
    prepare_frame_with_size(frame, INPUT_SIZE)
}

/// Letterboxes the frame into a `target_size` square and scales it to an
/// NHWC `[0, 1]` tensor.
pub fn prepare_frame_with_size(
    frame: &Frame,
    target_size: u32,
) -> Result<(Array4<f32>, LetterboxInfo)> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(anyhow!(
            "cannot run pose estimation on an empty {}x{} frame",
            frame.width(),
            frame.height()
        ));
    }

    let scale = target_size as f32 / (frame.width().max(frame.height()) as f32);
    let new_w = ((frame.width() as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((frame.height() as f32 * scale).round() as u32).clamp(1, target_size);

    let src_image = fir::images::Image::from_vec_u8(
        frame.width(),
        frame.height(),
        frame.image.as_raw().clone(),
        fir::PixelType::U8x3,
    )?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x3);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let pad_x = ((target_size - new_w) / 2) as usize;
    let pad_y = ((target_size - new_h) / 2) as usize;
    let mut canvas = vec![0u8; (target_size as usize) * (target_size as usize) * 3];
    let dst_stride = target_size as usize * 3;
    let src_stride = new_w as usize * 3;
    for row in 0..(new_h as usize) {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 3;
        let src_offset = row * src_stride;
        canvas[dst_offset..dst_offset + src_stride]
            .copy_from_slice(&resized[src_offset..src_offset + src_stride]);
    }

    let normalized: Vec<f32> = canvas.iter().map(|&v| v as f32 / 255.0).collect();
    let input = Array4::<f32>::from_shape_vec(
        (1, target_size as usize, target_size as usize, 3),
        normalized,
    )
    .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    let letterbox = LetterboxInfo {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        orig_w: frame.width(),
        orig_h: frame.height(),
    };

    Ok((input, letterbox))
}

pub fn decode_landmarks(flat: &[f32]) -> Result<Vec<[f32; LANDMARK_STRIDE]>> {
    if flat.len() < NUM_LANDMARKS * LANDMARK_STRIDE {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            NUM_LANDMARKS * LANDMARK_STRIDE
        ));
    }

    Ok(flat
        .chunks_exact(LANDMARK_STRIDE)
        .take(NUM_LANDMARKS)
        .map(|c| [c[0], c[1], c[2], c[3], c[4]])
        .collect())
}

/// Maps model-space landmarks back onto the original frame, normalized to
/// [0, 1]. Visibility comes out of the model as a logit.
pub fn project_landmarks(
    landmarks: &[[f32; LANDMARK_STRIDE]],
    letterbox: &LetterboxInfo,
) -> Vec<Landmark> {
    let max_x = letterbox.orig_w.saturating_sub(1) as f32;
    let max_y = letterbox.orig_h.saturating_sub(1) as f32;
    landmarks
        .iter()
        .map(|&[x, y, z, visibility, _presence]| {
            let px = ((x - letterbox.pad_x) / letterbox.scale).clamp(0.0, max_x);
            let py = ((y - letterbox.pad_y) / letterbox.scale).clamp(0.0, max_y);
            Landmark {
                x: px / letterbox.orig_w as f32,
                y: py / letterbox.orig_h as f32,
                z: z / letterbox.scale / letterbox.orig_w as f32,
                visibility: sigmoid(visibility),
            }
        })
        .collect()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;

    #[test]
    fn letterbox_keeps_aspect_ratio() {
        let frame = Frame::new(0, RgbImage::from_pixel(512, 256, image::Rgb([255, 255, 255])));
        let (input, letterbox) = prepare_frame(&frame).unwrap();

        assert_eq!(input.shape(), &[1, 256, 256, 3]);
        assert_eq!(letterbox.scale, 0.5);
        assert_eq!((letterbox.pad_x, letterbox.pad_y), (0.0, 64.0));
        // Padding is black, content is scaled to [0, 1].
        assert_eq!(input[[0, 10, 128, 0]], 0.0);
        assert!((input[[0, 128, 128, 0]] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn short_landmark_output_is_rejected() {
        assert!(decode_landmarks(&[0.0; 60]).is_err());
        let decoded = decode_landmarks(&vec![1.0; NUM_LANDMARKS * LANDMARK_STRIDE]).unwrap();
        assert_eq!(decoded.len(), NUM_LANDMARKS);
    }

    #[test]
    fn projection_undoes_the_letterbox() {
        let letterbox = LetterboxInfo {
            scale: 0.5,
            pad_x: 0.0,
            pad_y: 64.0,
            orig_w: 512,
            orig_h: 256,
        };
        let projected = project_landmarks(&[[128.0, 128.0, 0.0, 0.0, 0.0]], &letterbox);
        let lm = projected[0];
        assert!((lm.x - 0.5).abs() < 1e-6);
        assert!((lm.y - 128.0 / 256.0).abs() < 1e-6);
        assert!((lm.visibility - 0.5).abs() < 1e-6);

        let clamped = project_landmarks(&[[-40.0, 400.0, 0.0, 8.0, 0.0]], &letterbox)[0];
        assert_eq!(clamped.x, 0.0);
        assert!(clamped.y <= 1.0);
        assert!(clamped.visibility > 0.99);
    }
}
