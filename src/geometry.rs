use crate::types::{AngleSample, Landmark, LandmarkSet, Metric, PoseLandmark};

/// Angle in degrees at vertex `b` between the rays `b -> a` and `b -> c`,
/// using only the normalized x/y coordinates.
///
/// Returns `None` if either ray has zero length or a coordinate is not finite.
pub fn joint_angle(a: Landmark, b: Landmark, c: Landmark) -> Option<f64> {
    let v1 = sub(a, b);
    let v2 = sub(c, b);
    let norm1 = length(v1);
    let norm2 = length(v2);
    if !norm1.is_finite() || !norm2.is_finite() || norm1 == 0.0 || norm2 == 0.0 {
        return None;
    }

    // Rounding can push nearly collinear rays just past +/-1.
    let cosine = (dot(v1, v2) / (norm1 * norm2)).clamp(-1.0, 1.0);
    Some(cosine.acos().to_degrees()).filter(|degrees| degrees.is_finite())
}

/// Signed lean of the shoulder relative to the hip:
/// `degrees(atan2(shoulder.x - hip.x, shoulder.y - hip.y))`.
///
/// Image y grows downward, so an upright torso reads close to +/-180 and the
/// sign follows the horizontal offset of the shoulder.
pub fn torso_lean(shoulder: Landmark, hip: Landmark) -> f64 {
    let dx = shoulder.x as f64 - hip.x as f64;
    let dy = shoulder.y as f64 - hip.y as f64;
    dx.atan2(dy).to_degrees()
}

/// Every metric for one frame, each evaluated on its own landmarks.
pub fn compute_angles(landmarks: &LandmarkSet) -> [AngleSample; 5] {
    let lm = |which: PoseLandmark| landmarks.get(which);

    Metric::ALL.map(|metric| {
        let degrees = match metric {
            Metric::LeftKnee => joint_angle(
                lm(PoseLandmark::LeftHip),
                lm(PoseLandmark::LeftKnee),
                lm(PoseLandmark::LeftAnkle),
            ),
            Metric::RightKnee => joint_angle(
                lm(PoseLandmark::RightHip),
                lm(PoseLandmark::RightKnee),
                lm(PoseLandmark::RightAnkle),
            ),
            Metric::LeftHip => joint_angle(
                lm(PoseLandmark::LeftShoulder),
                lm(PoseLandmark::LeftHip),
                lm(PoseLandmark::LeftKnee),
            ),
            Metric::RightHip => joint_angle(
                lm(PoseLandmark::RightShoulder),
                lm(PoseLandmark::RightHip),
                lm(PoseLandmark::RightKnee),
            ),
            // NaN coordinates from the model leave the metric undefined.
            Metric::TorsoLean => Some(torso_lean(
                lm(PoseLandmark::LeftShoulder),
                lm(PoseLandmark::LeftHip),
            ))
            .filter(|degrees| degrees.is_finite()),
        };
        AngleSample { metric, degrees }
    })
}

fn sub(a: Landmark, b: Landmark) -> [f64; 2] {
    [a.x as f64 - b.x as f64, a.y as f64 - b.y as f64]
}

fn dot(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

fn length(v: [f64; 2]) -> f64 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}
