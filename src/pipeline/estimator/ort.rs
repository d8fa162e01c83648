use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{PoseEstimator, common};
use crate::{
    config::EstimatorConfig,
    model_download::ensure_pose_model_ready,
    types::{Frame, LandmarkSet},
};

/// BlazePose landmark model running on ONNX Runtime.
///
/// The session is loaded once per estimator and released when it is dropped.
/// Instances must not be shared between concurrently analysed videos.
pub struct OrtPoseEstimator {
    session: Session,
    min_pose_confidence: f32,
}

impl OrtPoseEstimator {
    pub fn new(config: &EstimatorConfig) -> Result<Self> {
        let model_path = &config.model_path;
        if config.auto_download {
            ensure_pose_model_ready(model_path, |_evt| {}).with_context(|| {
                format!("failed to prepare pose model at {}", model_path.display())
            })?;
        } else if !model_path.exists() {
            return Err(anyhow!("pose model not found at {}", model_path.display()));
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads.max(1))?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        log::info!("pose ORT backend ready using {}", model_path.display());

        Ok(Self {
            session,
            min_pose_confidence: config.min_pose_confidence,
        })
    }
}

impl PoseEstimator for OrtPoseEstimator {
    fn estimate(&mut self, frame: &Frame) -> Result<Option<LandmarkSet>> {
        let (input, letterbox) = common::prepare_frame(frame)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 2 {
            return Err(anyhow!(
                "pose model returned {} outputs, expected landmarks and score",
                outputs.len()
            ));
        }

        let score = outputs[1]
            .try_extract_array::<f32>()?
            .iter()
            .next()
            .copied()
            .unwrap_or(0.0);
        if score < self.min_pose_confidence {
            return Ok(None);
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let landmarks = common::decode_landmarks(&flattened)?;
        let projected = common::project_landmarks(&landmarks, &letterbox);

        Ok(LandmarkSet::from_slice(&projected))
    }
}
