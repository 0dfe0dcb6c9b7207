use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::VideoDownloader;
use crate::Result;

/// Smallest video stream up to 480p plus the best audio, falling back to
/// whatever single file is best
const FORMAT_SELECTOR: &str = "worstvideo[height<=480]+bestaudio/best";
const MERGE_FORMAT: &str = "mp4";

/// Video downloader using yt-dlp
pub struct YtDlpDownloader {
    yt_dlp_path: String,
}

impl YtDlpDownloader {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    fn build_args(url: &str, output_template: &Path) -> Vec<String> {
        vec![
            "-f".to_string(),
            FORMAT_SELECTOR.to_string(),
            "--merge-output-format".to_string(),
            MERGE_FORMAT.to_string(),
            "-o".to_string(),
            output_template.to_string_lossy().into_owned(),
            "--no-playlist".to_string(),
            url.to_string(),
        ]
    }
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl VideoDownloader for YtDlpDownloader {
    async fn download(&self, url: &str, output_template: &Path) -> Result<()> {
        tracing::debug!("Downloading video for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(Self::build_args(url, output_template))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed ({}): {}", output.status, error.trim());
        }

        Ok(())
    }

    fn tool_name(&self) -> &'static str {
        "yt-dlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let args = YtDlpDownloader::build_args(
            "https://youtu.be/abc",
            Path::new("downloads/temp_video.%(ext)s"),
        );
        assert_eq!(
            args,
            vec![
                "-f",
                "worstvideo[height<=480]+bestaudio/best",
                "--merge-output-format",
                "mp4",
                "-o",
                "downloads/temp_video.%(ext)s",
                "--no-playlist",
                "https://youtu.be/abc",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let downloader = YtDlpDownloader::new("yt-dlp-binary-that-does-not-exist");
        let result = downloader
            .download("https://youtu.be/abc", Path::new("/tmp/temp_video.%(ext)s"))
            .await;
        assert!(result.is_err());
    }
}
