use std::path::{Path, PathBuf};

use crate::{
    config::AnalysisConfig,
    error::{AnalysisError, AnalysisResult},
    pipeline::{FfmpegReader, FfmpegWriter, FrameSource, FramePipeline, OrtPoseEstimator, PoseEstimator},
    report::AnalysisOutcome,
};

/// `skeleton_<basename>` in the working directory.
pub fn default_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.mp4".to_string());
    PathBuf::from(format!("skeleton_{name}"))
}

/// Loads the pose model described by `config` and analyses `input`.
pub fn analyze_file(
    config: &AnalysisConfig,
    input: &Path,
    output: Option<&Path>,
) -> AnalysisResult<AnalysisOutcome> {
    let estimator = OrtPoseEstimator::new(&config.estimator)
        .map_err(|err| AnalysisError::model(&config.estimator.model_path, &err))?;
    analyze_video(estimator, config, input, output)
}

/// Runs the full pipeline with a caller-supplied estimator.
///
/// The output file is only created once the input has been opened. Both
/// FFmpeg processes are released before this returns, on success or error.
pub fn analyze_video<E: PoseEstimator>(
    estimator: E,
    config: &AnalysisConfig,
    input: &Path,
    output: Option<&Path>,
) -> AnalysisResult<AnalysisOutcome> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input));

    let mut reader = FfmpegReader::open(&config.video, input)?;
    let info = *reader.info();
    let mut writer = FfmpegWriter::create(&config.video, &output, &info)?;

    let mut pipeline = FramePipeline::new(estimator).with_overlay(config.overlay.enabled);
    let summary = pipeline.run(&mut reader, &mut writer)?;

    Ok(AnalysisOutcome::new(
        input.to_path_buf(),
        output,
        info,
        summary,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_prefixes_the_basename() {
        assert_eq!(
            default_output_path(Path::new("/tmp/uploads/temp_42_run.mp4")),
            PathBuf::from("skeleton_temp_42_run.mp4")
        );
        assert_eq!(
            default_output_path(Path::new("clip.mov")),
            PathBuf::from("skeleton_clip.mov")
        );
    }

    #[test]
    fn missing_input_fails_before_creating_output() {
        struct NeverCalled;
        impl PoseEstimator for NeverCalled {
            fn estimate(
                &mut self,
                _frame: &crate::types::Frame,
            ) -> anyhow::Result<Option<crate::types::LandmarkSet>> {
                unreachable!("no frames should be decoded")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("skeleton_missing.mp4");
        let err = analyze_video(
            NeverCalled,
            &AnalysisConfig::default(),
            &dir.path().join("missing.mp4"),
            Some(&output),
        )
        .unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
        assert!(!output.exists());
    }
}
