use image::{Rgb, RgbImage};

use crate::types::LandmarkSet;

/// BlazePose body connections, as drawn by MediaPipe.
pub const CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];

pub const SKELETON_LINE_THICKNESS: i32 = 2;
pub const LANDMARK_RADIUS: i32 = 2;

const LINE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const POINT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

pub fn draw_skeleton(image: &mut RgbImage, landmarks: &LandmarkSet) {
    let (width, height) = (image.width() as f32, image.height() as f32);
    let points: Vec<(f32, f32)> = landmarks
        .points()
        .iter()
        .map(|lm| (lm.x * width, lm.y * height))
        .collect();

    for &(a, b) in CONNECTIONS {
        if let (Some(pa), Some(pb)) = (points.get(a), points.get(b)) {
            draw_line(image, pa, pb, LINE_COLOR, SKELETON_LINE_THICKNESS);
        }
    }

    for &(x, y) in &points {
        draw_circle(image, (x as i32, y as i32), LANDMARK_RADIUS, POINT_COLOR);
    }
}

fn draw_line(image: &mut RgbImage, p0: &(f32, f32), p1: &(f32, f32), color: Rgb<u8>, thickness: i32) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    // Square brush exactly `thickness` pixels across.
    let thickness = thickness.max(1);
    let lo = -(thickness - 1) / 2;
    let hi = thickness / 2;

    loop {
        for ox in lo..=hi {
            for oy in lo..=hi {
                put_pixel_safe(image, x0 + ox, y0 + oy, color);
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(image: &mut RgbImage, center: (i32, i32), radius: i32, color: Rgb<u8>) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(image, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= image.width() || uy >= image.height() {
        return;
    }
    image.put_pixel(ux, uy, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Landmark, POSE_LANDMARK_COUNT, PoseLandmark};

    #[test]
    fn connections_reference_body_landmarks() {
        assert_eq!(CONNECTIONS.len(), 35);
        assert!(
            CONNECTIONS
                .iter()
                .all(|&(a, b)| a < POSE_LANDMARK_COUNT && b < POSE_LANDMARK_COUNT)
        );
    }

    #[test]
    fn draws_points_and_bones() {
        let mut points = [Landmark::new(0.5, 0.1); POSE_LANDMARK_COUNT];
        points[PoseLandmark::LeftHip.index()] = Landmark::new(0.25, 0.5);
        points[PoseLandmark::LeftKnee.index()] = Landmark::new(0.25, 0.9);
        let mut image = RgbImage::new(40, 40);
        draw_skeleton(&mut image, &LandmarkSet::new(points));

        assert_eq!(*image.get_pixel(10, 20), POINT_COLOR);
        // Midway along the left thigh.
        assert_eq!(*image.get_pixel(10, 28), LINE_COLOR);
        assert_eq!(*image.get_pixel(35, 35), Rgb([0, 0, 0]));
    }

    #[test]
    fn lines_are_drawn_at_full_thickness() {
        for thickness in 1..=4 {
            let mut image = RgbImage::new(20, 20);
            draw_line(&mut image, &(2.0, 10.0), &(17.0, 10.0), LINE_COLOR, thickness);
            let painted = (0..20)
                .filter(|&y| *image.get_pixel(9, y) == LINE_COLOR)
                .count();
            assert_eq!(painted, thickness as usize);
        }
        assert_eq!(SKELETON_LINE_THICKNESS, 2);
    }

    #[test]
    fn out_of_frame_points_are_clipped() {
        let points = [Landmark::new(1.4, -0.3); POSE_LANDMARK_COUNT];
        let mut image = RgbImage::new(8, 8);
        draw_skeleton(&mut image, &LandmarkSet::new(points));
        assert!(image.pixels().all(|px| *px == Rgb([0, 0, 0])));
    }
}
