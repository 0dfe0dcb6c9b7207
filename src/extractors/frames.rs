use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::FrameExtractor;
use crate::Result;

/// File name prefix of captured frames
pub const FRAME_PREFIX: &str = "img_";
/// ffmpeg pattern; past 999 ffmpeg widens the number instead of wrapping
pub const FRAME_PATTERN: &str = "img_%03d.jpg";

/// Frame extractor using ffmpeg's fps filter
pub struct FfmpegFrameExtractor {
    ffmpeg_path: String,
}

impl FfmpegFrameExtractor {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    fn build_args(video_path: &Path, interval_secs: u32, output_dir: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            video_path.to_string_lossy().into_owned(),
            "-vf".to_string(),
            format!("fps=1/{}", interval_secs),
            output_dir.join(FRAME_PATTERN).to_string_lossy().into_owned(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ]
    }
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_frames(
        &self,
        video_path: &Path,
        interval_secs: u32,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        if interval_secs == 0 {
            anyhow::bail!("Frame interval must be positive");
        }

        tracing::debug!(
            "Capturing a frame every {}s from {}",
            interval_secs,
            video_path.display()
        );

        let output = Command::new(&self.ffmpeg_path)
            .args(Self::build_args(video_path, interval_secs, output_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to capture frames with ffmpeg: {}", error.trim());
        }

        Ok(list_frames(output_dir))
    }
}

fn is_frame(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(FRAME_PREFIX) && n.ends_with(".jpg"))
        .unwrap_or(false)
}

/// Frames currently in `dir`, in file name order
pub fn list_frames(dir: &Path) -> Vec<PathBuf> {
    let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| is_frame(path))
        .collect();
    frames.sort();
    frames
}

/// Remove frames from an earlier run so they cannot leak into this report
pub fn clear_frames(dir: &Path) -> Result<usize> {
    let frames = list_frames(dir);
    for frame in &frames {
        fs_err::remove_file(frame)?;
    }
    Ok(frames.len())
}
