pub mod estimator;
pub mod frame;
pub mod skeleton;
pub mod video;

// Re-exports for convenience
pub use estimator::{OrtPoseEstimator, PoseEstimator};
pub use video::{FfmpegReader, FfmpegWriter, VideoInfo, probe_video};

use std::path::Path;

use crate::{
    error::{AnalysisError, AnalysisResult},
    geometry::compute_angles,
    report::AnalysisReport,
    series::SeriesAggregator,
    types::Frame,
};

/// A finite, non-restartable sequence of decoded frames.
pub trait FrameSource {
    fn info(&self) -> &VideoInfo;

    /// The video being decoded, used to name it in errors.
    fn path(&self) -> &Path;

    /// `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> AnalysisResult<Option<Frame>>;
}

/// Receives exactly one frame per input frame.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> AnalysisResult<()>;

    fn finish(&mut self) -> AnalysisResult<()>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub frames_with_pose: u64,
    pub report: AnalysisReport,
}

/// Drives decode -> estimate -> angles -> series, writing each frame out as
/// it goes. Strictly sequential.
pub struct FramePipeline<E> {
    estimator: E,
    overlay: bool,
}

impl<E: PoseEstimator> FramePipeline<E> {
    pub fn new(estimator: E) -> Self {
        Self {
            estimator,
            overlay: true,
        }
    }

    pub fn with_overlay(mut self, enabled: bool) -> Self {
        self.overlay = enabled;
        self
    }

    pub fn into_estimator(self) -> E {
        self.estimator
    }

    /// Processing errors coming out of the run name the source's input file.
    pub fn run<S, W>(&mut self, source: &mut S, sink: &mut W) -> AnalysisResult<RunSummary>
    where
        S: FrameSource + ?Sized,
        W: FrameSink + ?Sized,
    {
        self.run_frames(source, sink)
            .map_err(|err| err.with_input(source.path()))
    }

    fn run_frames<S, W>(&mut self, source: &mut S, sink: &mut W) -> AnalysisResult<RunSummary>
    where
        S: FrameSource + ?Sized,
        W: FrameSink + ?Sized,
    {
        let VideoInfo { width, height, .. } = *source.info();
        let mut aggregator = SeriesAggregator::new();
        let mut frames_processed = 0u64;
        let mut frames_with_pose = 0u64;

        while let Some(frame) = source.next_frame()? {
            let index = frame.index;
            let mut frame = frame::conform(frame, width, height)
                .map_err(|err| AnalysisError::processing(index, format!("{err:#}")))?;

            let landmarks = self
                .estimator
                .estimate(&frame)
                .map_err(|err| AnalysisError::processing(index, format!("{err:#}")))?;

            match landmarks {
                Some(landmarks) => {
                    frames_with_pose += 1;
                    aggregator.record(&compute_angles(&landmarks));
                    if self.overlay {
                        skeleton::draw_skeleton(&mut frame.image, &landmarks);
                    }
                }
                None => log::debug!("frame {index}: no pose detected"),
            }

            sink.write_frame(&frame)?;
            frames_processed += 1;
        }

        sink.finish()?;

        log::info!("processed {frames_processed} frames, pose found in {frames_with_pose}");

        Ok(RunSummary {
            frames_processed,
            frames_with_pose,
            report: AnalysisReport::from_summaries(aggregator.finish()),
        })
    }
}
