use serde::Serialize;

use crate::types::{AngleSample, Metric};

/// Min/max/mean of one metric; every field is `None` for an empty series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl SummaryStats {
    pub fn is_defined(&self) -> bool {
        self.mean.is_some()
    }
}

pub fn reduce(values: &[f64]) -> SummaryStats {
    let Some(&first) = values.first() else {
        return SummaryStats::default();
    };

    let (min, max, sum) = values
        .iter()
        .fold((first, first, 0.0), |(min, max, sum), &v| {
            (min.min(v), max.max(v), sum + v)
        });

    SummaryStats {
        min: Some(min),
        max: Some(max),
        mean: Some(sum / values.len() as f64),
    }
}

#[derive(Clone, Debug, Default)]
pub struct MetricSeries {
    values: Vec<f64>,
}

impl MetricSeries {
    pub fn push(&mut self, degrees: f64) {
        self.values.push(degrees);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn summary(&self) -> SummaryStats {
        reduce(&self.values)
    }
}

/// Per-metric running series for one video.
#[derive(Clone, Debug, Default)]
pub struct SeriesAggregator {
    series: [MetricSeries; 5],
}

impl SeriesAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the defined samples; undefined ones leave their series as is.
    pub fn record(&mut self, samples: &[AngleSample]) {
        for sample in samples {
            if let Some(degrees) = sample.degrees {
                self.series[sample.metric.slot()].push(degrees);
            }
        }
    }

    pub fn series(&self, metric: Metric) -> &MetricSeries {
        &self.series[metric.slot()]
    }

    pub fn finish(self) -> MetricSummaries {
        let stats = |metric: Metric| self.series[metric.slot()].summary();
        MetricSummaries {
            left_knee: stats(Metric::LeftKnee),
            right_knee: stats(Metric::RightKnee),
            left_hip: stats(Metric::LeftHip),
            right_hip: stats(Metric::RightHip),
            torso_lean: stats(Metric::TorsoLean),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MetricSummaries {
    pub left_knee: SummaryStats,
    pub right_knee: SummaryStats,
    pub left_hip: SummaryStats,
    pub right_hip: SummaryStats,
    pub torso_lean: SummaryStats,
}

impl MetricSummaries {
    pub fn get(&self, metric: Metric) -> &SummaryStats {
        match metric {
            Metric::LeftKnee => &self.left_knee,
            Metric::RightKnee => &self.right_knee,
            Metric::LeftHip => &self.left_hip,
            Metric::RightHip => &self.right_hip,
            Metric::TorsoLean => &self.torso_lean,
        }
    }

    pub fn mean(&self, metric: Metric) -> Option<f64> {
        self.get(metric).mean
    }
}
