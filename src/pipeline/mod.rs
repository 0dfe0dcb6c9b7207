//! Stage-by-stage orchestration: prepare, download, transcribe, capture
//! screenshots, assemble.
//!
//! Stages run strictly one after another and share nothing but the
//! workspace on disk. The first failing stage ends the run; files written by
//! earlier stages stay where they are.

use indicatif::MultiProgress;
use std::path::{Path, PathBuf};

pub mod progress;

pub use progress::{BarProgress, ProgressReporter, SilentProgress};

use crate::config::Config;
use crate::extractors::{
    frames, FfmpegFrameExtractor, FrameExtractor, VideoDownloader, YtDlpDownloader,
};
use crate::report::{self, AssemblySummary, ReportStyle};
use crate::resources::{ensure_resource, HttpFetcher, ResourceFetcher};
use crate::transcribe::{write_transcript, Transcriber, WhisperCli};
use crate::utils::{extract_domain, validate_and_normalize_url, validate_interval};
use crate::workspace::{Workspace, VIDEO_STEM};
use crate::ReportError;

/// Pipeline checkpoints, in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Preparing,
    Downloading,
    Transcribing,
    CapturingFrames,
    Assembling,
    Done,
}

impl Stage {
    pub fn percent(self) -> u8 {
        match self {
            Stage::Preparing => 0,
            Stage::Downloading => 20,
            Stage::Transcribing => 50,
            Stage::CapturingFrames => 80,
            Stage::Assembling => 90,
            Stage::Done => 100,
        }
    }

    pub fn status(self) -> &'static str {
        match self {
            Stage::Preparing => "Preparing environment...",
            Stage::Downloading => "Downloading video...",
            Stage::Transcribing => "Transcribing audio (this takes a while)...",
            Stage::CapturingFrames => "Capturing screenshots...",
            Stage::Assembling => "Building PDF report...",
            Stage::Done => "Done",
        }
    }
}

/// External tools the pipeline drives
pub struct Collaborators {
    pub downloader: Box<dyn VideoDownloader>,
    pub transcriber: Box<dyn Transcriber>,
    pub frames: Box<dyn FrameExtractor>,
    pub fetcher: Box<dyn ResourceFetcher>,
}

impl Collaborators {
    /// `bars` is where download progress is drawn; `None` keeps it hidden
    pub fn from_config(
        config: &Config,
        workspace: &Workspace,
        bars: Option<MultiProgress>,
    ) -> Self {
        Self {
            downloader: Box::new(YtDlpDownloader::new(&config.tools.yt_dlp)),
            transcriber: Box::new(WhisperCli::new(
                &config.tools.whisper,
                &config.transcription.model,
                config.transcription.language.clone(),
                workspace.downloads_dir(),
            )),
            frames: Box::new(FfmpegFrameExtractor::new(&config.tools.ffmpeg)),
            fetcher: Box::new(HttpFetcher::new(bars)),
        }
    }
}

/// Where a successful run left its report, and what went into it
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub path: PathBuf,
    pub summary: AssemblySummary,
}

/// Video URL to PDF report
pub struct ReportPipeline {
    workspace: Workspace,
    font_path: PathBuf,
    font_url: String,
    style: ReportStyle,
    collaborators: Collaborators,
}

impl ReportPipeline {
    /// Create a pipeline backed by yt-dlp, whisper, ffmpeg and HTTP
    pub fn new(config: &Config, bars: Option<MultiProgress>) -> Self {
        let workspace = Workspace::new(&config.workspace.work_dir);
        let collaborators = Collaborators::from_config(config, &workspace, bars);
        Self::with_collaborators(config, collaborators)
    }

    pub fn with_collaborators(config: &Config, collaborators: Collaborators) -> Self {
        Self {
            workspace: Workspace::new(&config.workspace.work_dir),
            font_path: config.font_path(),
            font_url: config.font.url.clone(),
            style: ReportStyle::from_config(&config.report),
            collaborators,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Run every stage once and return the finished report
    pub async fn run(
        &self,
        url: &str,
        interval_secs: u32,
        progress: &dyn ProgressReporter,
    ) -> Result<GeneratedReport, ReportError> {
        let url = validate_and_normalize_url(url)
            .map_err(|e| ReportError::InputInvalid(e.to_string()))?;
        let interval_secs = validate_interval(interval_secs)
            .map_err(|e| ReportError::InputInvalid(e.to_string()))?;

        progress.stage(Stage::Preparing);
        self.prepare().await?;

        progress.stage(Stage::Downloading);
        let video = self.acquire(&url).await?;

        progress.stage(Stage::Transcribing);
        let transcript = self.transcribe(&video).await?;

        progress.stage(Stage::CapturingFrames);
        let screenshot_dir = self.capture_frames(&video, interval_secs).await?;

        progress.stage(Stage::Assembling);
        let report = self.assemble(&transcript, &screenshot_dir)?;

        progress.stage(Stage::Done);
        Ok(report)
    }

    async fn prepare(&self) -> Result<(), ReportError> {
        tracing::debug!("Working directory: {}", self.workspace.root().display());

        // A missing font only matters once the PDF is drawn
        if let Err(e) = ensure_resource(
            &self.font_path,
            &self.font_url,
            self.collaborators.fetcher.as_ref(),
        )
        .await
        {
            tracing::warn!("Font download failed, continuing: {:#}", e);
        }

        self.workspace.prepare()?;
        Ok(())
    }

    async fn acquire(&self, url: &str) -> Result<PathBuf, ReportError> {
        let removed = self.workspace.clear_video()?;
        if removed > 0 {
            tracing::debug!("Removed {} stale video file(s)", removed);
        }

        let downloader = self.collaborators.downloader.as_ref();
        tracing::info!(
            "Downloading from {} with {}",
            extract_domain(url).unwrap_or_else(|| url.to_string()),
            downloader.tool_name()
        );
        let outcome = downloader
            .download(url, &self.workspace.video_template())
            .await;

        match (self.workspace.find_video(), outcome) {
            (Some(video), Ok(())) => {
                tracing::info!("Video saved to {}", video.display());
                Ok(video)
            }
            (Some(video), Err(e)) => {
                tracing::warn!(
                    "{} reported an error but produced {}: {:#}",
                    downloader.tool_name(),
                    video.display(),
                    e
                );
                Ok(video)
            }
            (None, Err(e)) => Err(ReportError::AcquisitionFailed(format!("{:#}", e))),
            (None, Ok(())) => Err(ReportError::AcquisitionFailed(format!(
                "no {}.* video found in {}",
                VIDEO_STEM,
                self.workspace.downloads_dir().display()
            ))),
        }
    }

    async fn transcribe(&self, video: &Path) -> Result<PathBuf, ReportError> {
        let transcriber = self.collaborators.transcriber.as_ref();
        tracing::info!("Transcribing with whisper model '{}'", transcriber.model_name());

        let segments = transcriber
            .transcribe(video)
            .await
            .map_err(|e| ReportError::TranscriptionFailed(format!("{:#}", e)))?;

        let path = self.workspace.transcript_path();
        let lines = write_transcript(&segments, &path)
            .map_err(|e| ReportError::TranscriptionFailed(format!("{:#}", e)))?;
        tracing::info!("Wrote {} transcript lines to {}", lines, path.display());

        Ok(path)
    }

    async fn capture_frames(
        &self,
        video: &Path,
        interval_secs: u32,
    ) -> Result<PathBuf, ReportError> {
        let dir = self.workspace.screenshot_dir();
        frames::clear_frames(&dir)
            .map_err(|e| ReportError::FrameExtractionFailed(format!("{:#}", e)))?;

        let captured = self
            .collaborators
            .frames
            .extract_frames(video, interval_secs, &dir)
            .await
            .map_err(|e| ReportError::FrameExtractionFailed(format!("{:#}", e)))?;

        if captured.is_empty() {
            tracing::warn!("No screenshots captured from {}", video.display());
        } else {
            tracing::info!("Captured {} screenshots every {}s", captured.len(), interval_secs);
        }

        Ok(dir)
    }

    fn assemble(
        &self,
        transcript: &Path,
        screenshot_dir: &Path,
    ) -> Result<GeneratedReport, ReportError> {
        let path = self.workspace.report_path();
        let generated = chrono::Local::now().format("Generated %Y-%m-%d %H:%M").to_string();
        let style = self.style.clone().with_generated_at(generated);

        let summary = report::assemble(transcript, screenshot_dir, &path, &self.font_path, &style)?;
        Ok(GeneratedReport { path, summary })
    }
}

/// The finished report as bytes, ready to hand to the user
pub fn read_report(path: &Path) -> crate::Result<Vec<u8>> {
    let bytes = fs_err::read(path)?;
    if bytes.is_empty() {
        anyhow::bail!("Report {} is empty", path.display());
    }
    Ok(bytes)
}
