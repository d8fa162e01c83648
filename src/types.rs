use image::RgbImage;

pub const POSE_LANDMARK_COUNT: usize = 33;

#[derive(Clone, Debug)]
pub struct Frame {
    pub index: u64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A single body joint. `x`/`y` are normalized to [0, 1] relative to the
/// frame width and height; `visibility` is the estimator's confidence.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }
}

/// BlazePose body topology, in model output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl PoseLandmark {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One detected person. Always holds every BlazePose landmark.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkSet {
    points: [Landmark; POSE_LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn new(points: [Landmark; POSE_LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Builds a set from the first 33 points; `None` if fewer are supplied.
    pub fn from_slice(points: &[Landmark]) -> Option<Self> {
        let points: [Landmark; POSE_LANDMARK_COUNT] =
            points.get(..POSE_LANDMARK_COUNT)?.try_into().ok()?;
        Some(Self { points })
    }

    pub fn get(&self, landmark: PoseLandmark) -> Landmark {
        self.points[landmark.index()]
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    LeftKnee,
    RightKnee,
    LeftHip,
    RightHip,
    TorsoLean,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::LeftKnee,
        Metric::RightKnee,
        Metric::LeftHip,
        Metric::RightHip,
        Metric::TorsoLean,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::LeftKnee => "left_knee",
            Metric::RightKnee => "right_knee",
            Metric::LeftHip => "left_hip",
            Metric::RightHip => "right_hip",
            Metric::TorsoLean => "torso_lean",
        }
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

/// One metric's value for one frame. `degrees` is `None` when the geometry
/// was degenerate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngleSample {
    pub metric: Metric,
    pub degrees: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landmark_set_requires_full_topology() {
        let short = vec![Landmark::default(); 20];
        assert!(LandmarkSet::from_slice(&short).is_none());

        let mut points = vec![Landmark::default(); 39];
        points[PoseLandmark::LeftKnee.index()] = Landmark::new(0.4, 0.7);
        let set = LandmarkSet::from_slice(&points).expect("33 points available");
        assert_eq!(set.points().len(), POSE_LANDMARK_COUNT);
        assert_eq!(set.get(PoseLandmark::LeftKnee), Landmark::new(0.4, 0.7));
    }

    #[test]
    fn metric_names_are_stable() {
        let names: Vec<_> = Metric::ALL.iter().map(Metric::name).collect();
        assert_eq!(
            names,
            ["left_knee", "right_knee", "left_hip", "right_hip", "torso_lean"]
        );
        assert_eq!(PoseLandmark::RightFootIndex.index(), POSE_LANDMARK_COUNT - 1);
    }
}
