use crate::{series::MetricSummaries, types::Metric};

const OVERSTRIDE_KNEE_DEGREES: f64 = 160.0;
const EXCESSIVE_LEAN_DEGREES: f64 = 30.0;
const MIN_HIP_EXTENSION_DEGREES: f64 = 100.0;

// Missing knee means read as fully flexed, missing hip means as fully
// extended. Both land on the positive tip.
const MISSING_KNEE_MEAN: f64 = 0.0;
const MISSING_TORSO_MEAN: f64 = 0.0;
const MISSING_HIP_MEAN: f64 = 180.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tip {
    Overstriding,
    GoodStride,
    ExcessiveLean,
    GoodPosture,
    LimitedHipExtension,
    GoodHipExtension,
}

impl Tip {
    pub fn message(&self) -> &'static str {
        match self {
            Tip::Overstriding => {
                "Possible overstriding: your knee is nearly straight through the stride. \
                 Try landing with a slightly bent knee under your hips."
            }
            Tip::GoodStride => "Good stride: your knees stay comfortably flexed.",
            Tip::ExcessiveLean => {
                "Excessive torso lean detected. Run tall and lean gently from the ankles, \
                 not the waist."
            }
            Tip::GoodPosture => "Good posture: your torso lean is within a healthy range.",
            Tip::LimitedHipExtension => {
                "Limited hip extension. Focus on driving the leg back and engaging your glutes."
            }
            Tip::GoodHipExtension => "Good hip extension: you are driving well from the hips.",
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            Tip::GoodStride | Tip::GoodPosture | Tip::GoodHipExtension
        )
    }
}

/// Stride, torso and hip checks, always in that order.
pub fn evaluate(summaries: &MetricSummaries) -> [Tip; 3] {
    [
        stride_tip(summaries),
        torso_tip(summaries),
        hip_tip(summaries),
    ]
}

pub fn messages(tips: &[Tip; 3]) -> [String; 3] {
    tips.map(|tip| tip.message().to_string())
}

fn stride_tip(summaries: &MetricSummaries) -> Tip {
    let left = summaries.mean(Metric::LeftKnee).unwrap_or(MISSING_KNEE_MEAN);
    let right = summaries.mean(Metric::RightKnee).unwrap_or(MISSING_KNEE_MEAN);
    if left.max(right) > OVERSTRIDE_KNEE_DEGREES {
        Tip::Overstriding
    } else {
        Tip::GoodStride
    }
}

fn torso_tip(summaries: &MetricSummaries) -> Tip {
    let lean = summaries.mean(Metric::TorsoLean).unwrap_or(MISSING_TORSO_MEAN);
    if lean.abs() > EXCESSIVE_LEAN_DEGREES {
        Tip::ExcessiveLean
    } else {
        Tip::GoodPosture
    }
}

fn hip_tip(summaries: &MetricSummaries) -> Tip {
    let left = summaries.mean(Metric::LeftHip).unwrap_or(MISSING_HIP_MEAN);
    let right = summaries.mean(Metric::RightHip).unwrap_or(MISSING_HIP_MEAN);
    if left.min(right) < MIN_HIP_EXTENSION_DEGREES {
        Tip::LimitedHipExtension
    } else {
        Tip::GoodHipExtension
    }
}
