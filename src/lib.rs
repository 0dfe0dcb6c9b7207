//! Video Report - A Rust CLI tool that turns a video URL into a PDF report
//!
//! This library downloads a video, transcribes its audio, captures periodic
//! screenshots and assembles everything into a single paginated PDF document.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod pipeline;
pub mod report;
pub mod resources;
pub mod transcribe;
pub mod utils;
pub mod workspace;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{FrameExtractor, VideoDownloader};
pub use pipeline::{GeneratedReport, ProgressReporter, ReportPipeline, Stage};
pub use report::{assemble, AssemblyError, AssemblySummary, ReportStyle};
pub use transcribe::{Segment, Transcriber};
pub use workspace::Workspace;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Terminal outcome of a failed pipeline run
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("Invalid input: {0}")]
    InputInvalid(String),

    #[error("Video download failed: {0}")]
    AcquisitionFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Screenshot extraction failed: {0}")]
    FrameExtractionFailed(String),

    #[error("Report assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),
}
