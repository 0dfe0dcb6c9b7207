use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod frames;
pub mod youtube;

pub use frames::FfmpegFrameExtractor;
pub use youtube::YtDlpDownloader;

use crate::Result;

/// Fetches a video so later stages can read it from disk
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoDownloader: Send + Sync {
    /// Download `url` using the yt-dlp style output template.
    ///
    /// Callers locate the result on disk by its stem; the return value only
    /// tells whether the tool itself reported success.
    async fn download(&self, url: &str, output_template: &Path) -> Result<()>;

    /// Get the name of the underlying tool
    fn tool_name(&self) -> &'static str;
}

/// Captures still frames from a video at a fixed interval
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Write numbered frames into `output_dir`, one every `interval_secs`
    async fn extract_frames(
        &self,
        video_path: &Path,
        interval_secs: u32,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>>;
}
