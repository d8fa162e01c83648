pub mod common;
mod ort;

pub use self::ort::OrtPoseEstimator;
use crate::types::{Frame, LandmarkSet};

/// Turns one RGB frame into at most one person's landmarks.
///
/// `Ok(None)` means nobody was detected, which is an ordinary per-frame
/// outcome. `Err` aborts the run.
pub trait PoseEstimator {
    fn estimate(&mut self, frame: &Frame) -> anyhow::Result<Option<LandmarkSet>>;
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for &mut E {
    fn estimate(&mut self, frame: &Frame) -> anyhow::Result<Option<LandmarkSet>> {
        (**self).estimate(frame)
    }
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for Box<E> {
    fn estimate(&mut self, frame: &Frame) -> anyhow::Result<Option<LandmarkSet>> {
        (**self).estimate(frame)
    }
}
