use std::path::PathBuf;

use serde::Serialize;

use crate::{
    feedback::{self, Tip},
    pipeline::{RunSummary, VideoInfo},
    series::MetricSummaries,
};

pub const STATUS_COMPLETE: &str = "analysis_complete";

/// Per-metric statistics plus the three coaching tips.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub metrics: MetricSummaries,
    pub feedback: [String; 3],
    #[serde(skip)]
    pub tips: [Tip; 3],
}

impl AnalysisReport {
    pub fn from_summaries(metrics: MetricSummaries) -> Self {
        let tips = feedback::evaluate(&metrics);
        Self {
            metrics,
            feedback: feedback::messages(&tips),
            tips,
        }
    }
}

/// Everything handed back to the caller after a successful run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub input_video: PathBuf,
    pub output_video: PathBuf,
    pub status: &'static str,
    pub frames_processed: u64,
    pub frames_with_pose: u64,
    pub video: VideoInfo,
    #[serde(flatten)]
    pub report: AnalysisReport,
}

impl AnalysisOutcome {
    pub fn new(input: PathBuf, output: PathBuf, video: VideoInfo, summary: RunSummary) -> Self {
        Self {
            input_video: input,
            output_video: output,
            status: STATUS_COMPLETE,
            frames_processed: summary.frames_processed,
            frames_with_pose: summary.frames_with_pose,
            video,
            report: summary.report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::reduce;

    #[test]
    fn outcome_serializes_as_a_flat_record() {
        let metrics = MetricSummaries {
            left_knee: reduce(&[150.0, 170.0]),
            ..Default::default()
        };
        let summary = RunSummary {
            frames_processed: 4,
            frames_with_pose: 2,
            report: AnalysisReport::from_summaries(metrics),
        };
        let video = VideoInfo {
            width: 640,
            height: 480,
            fps: 30.0,
        };
        let outcome = AnalysisOutcome::new(
            PathBuf::from("run.mp4"),
            PathBuf::from("skeleton_run.mp4"),
            video,
            summary,
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "analysis_complete");
        assert_eq!(json["output_video"], "skeleton_run.mp4");
        assert_eq!(json["metrics"]["left_knee"]["mean"], 160.0);
        assert!(json["metrics"]["right_hip"]["min"].is_null());
        assert_eq!(json["feedback"].as_array().unwrap().len(), 3);
        assert_eq!(json["feedback"][0], Tip::GoodStride.message());
        assert!(json.get("tips").is_none());
    }
}
