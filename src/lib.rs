//! Running-form video analysis.
//!
//! Decodes a video, estimates one runner's pose per frame, writes a
//! skeleton-annotated copy, and reduces knee, hip and torso angles into
//! summary statistics with three coaching tips.

pub mod analysis;
pub mod config;
pub mod error;
pub mod feedback;
pub mod geometry;
pub mod model_download;
pub mod pipeline;
pub mod report;
pub mod series;
pub mod types;

pub use analysis::{analyze_file, analyze_video, default_output_path};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, AnalysisResult, ErrorKind, ErrorRecord};
pub use report::{AnalysisOutcome, AnalysisReport};
