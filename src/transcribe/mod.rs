use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

pub mod whisper;

pub use whisper::WhisperCli;

use crate::Result;

/// Individual transcript segment with timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Segment text
    pub text: String,
}

/// Turns the speech in a media file into timed segments
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, media_path: &Path) -> Result<Vec<Segment>>;

    /// Model identifier, for logging
    fn model_name(&self) -> String;
}

/// Format seconds as `M:SS` (minutes are not padded and may exceed 59)
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// One transcript line: `[M:SS] text`
pub fn format_segment_line(segment: &Segment) -> String {
    format!("[{}] {}", format_timestamp(segment.start), segment.text.trim())
}

/// Write one line per segment, ordered by start time.
///
/// The sort is stable, so segments sharing a start time keep the order the
/// transcriber produced them in.
pub fn write_transcript(segments: &[Segment], path: &Path) -> Result<usize> {
    let mut ordered: Vec<&Segment> = segments.iter().collect();
    ordered.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut file = std::io::BufWriter::new(
        fs_err::File::create(path).context("Failed to create transcript file")?,
    );
    for segment in &ordered {
        writeln!(file, "{}", format_segment_line(segment))?;
    }
    file.flush()?;

    Ok(ordered.len())
}
