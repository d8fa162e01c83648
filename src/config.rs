use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model_download::default_pose_model_path;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub estimator: EstimatorConfig,
    pub video: VideoConfig,
    pub overlay: OverlayConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub model_path: PathBuf,
    /// Pose score below which a frame counts as "no person".
    pub min_pose_confidence: f32,
    pub intra_threads: usize,
    pub auto_download: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            model_path: default_pose_model_path(),
            min_pose_confidence: 0.5,
            intra_threads: 2,
            auto_download: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Used when the container reports no (or a zero) frame rate.
    pub fallback_fps: f64,
    pub codec: String,
    /// FFmpeg `-q:v`, 1 (best) to 31.
    pub quality: u8,
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fallback_fps: 30.0,
            codec: "mpeg4".to_string(),
            quality: 5,
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub enabled: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AnalysisConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AnalysisConfig::default();
        assert_eq!(config.video.fallback_fps, 30.0);
        assert_eq!(config.video.codec, "mpeg4");
        assert_eq!(config.estimator.min_pose_confidence, 0.5);
        assert!(config.overlay.enabled);
        assert_eq!(config.estimator.model_path, default_pose_model_path());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[video]\nfallback_fps = 25.0\n\n[estimator]\nmodel_path = \"weights/pose.onnx\"\n"
        )
        .unwrap();

        let config = AnalysisConfig::load(file.path()).unwrap();
        assert_eq!(config.video.fallback_fps, 25.0);
        assert_eq!(config.video.ffmpeg, "ffmpeg");
        assert_eq!(config.estimator.model_path, PathBuf::from("weights/pose.onnx"));
        assert_eq!(config.estimator.intra_threads, 2);
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[video\nfallback_fps = ").unwrap();

        let err = AnalysisConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config"));
    }
}
