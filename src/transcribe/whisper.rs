use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{Segment, Transcriber};
use crate::Result;

/// Whisper JSON output format
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    language: Option<String>,
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Speech-to-text through the `whisper` command line tool
pub struct WhisperCli {
    whisper_path: String,
    model: String,
    language: Option<String>,
    output_dir: PathBuf,
}

impl WhisperCli {
    pub fn new(
        whisper_path: impl Into<String>,
        model: impl Into<String>,
        language: Option<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            whisper_path: whisper_path.into(),
            model: model.into(),
            language,
            output_dir: output_dir.into(),
        }
    }

    fn build_args(&self, media_path: &Path) -> Vec<String> {
        let mut args = vec![
            media_path.to_string_lossy().into_owned(),
            "--model".to_string(),
            self.model.clone(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            self.output_dir.to_string_lossy().into_owned(),
            // CPU inference does not support half precision
            "--fp16".to_string(),
            "False".to_string(),
        ];
        if let Some(lang) = &self.language {
            args.push("--language".to_string());
            args.push(lang.clone());
        }
        args
    }

    /// Whisper names its output after the input file stem
    fn json_output_path(&self, media_path: &Path) -> PathBuf {
        let stem = media_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "transcript".to_string());
        self.output_dir.join(format!("{}.json", stem))
    }
}

/// Parse whisper's JSON output into segments
pub fn parse_whisper_json(json: &str) -> Result<Vec<Segment>> {
    let output: WhisperOutput =
        serde_json::from_str(json).context("Failed to parse whisper JSON")?;

    if let Some(lang) = &output.language {
        tracing::info!("Detected language: {}", lang);
    }

    Ok(output
        .segments
        .into_iter()
        .map(|s| Segment {
            start: s.start,
            end: s.end,
            text: s.text,
        })
        .collect())
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn transcribe(&self, media_path: &Path) -> Result<Vec<Segment>> {
        tracing::debug!(
            "Running whisper ({}) on {}",
            self.model,
            media_path.display()
        );

        let output = Command::new(&self.whisper_path)
            .args(self.build_args(media_path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to start {}", self.whisper_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("whisper failed ({}): {}", output.status, error.trim());
        }

        let json_path = self.json_output_path(media_path);
        let json = tokio::fs::read_to_string(&json_path)
            .await
            .with_context(|| format!("Whisper output not found at {}", json_path.display()))?;

        parse_whisper_json(&json)
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whisper_json() {
        let json = r#"{
            "text": " Hello world Market is up",
            "segments": [
                {"id": 0, "start": 5.0, "end": 8.2, "text": " Hello world", "tokens": [1, 2]},
                {"id": 1, "start": 90.4, "end": 93.0, "text": " Market is up", "tokens": [3]}
            ],
            "language": "en"
        }"#;

        let segments = parse_whisper_json(json).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, 5.0);
        assert_eq!(segments[0].text, " Hello world");
        assert_eq!(segments[1].end, 93.0);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_whisper_json("not json").is_err());
        assert!(parse_whisper_json(r#"{"text": "no segments"}"#).is_err());
    }

    #[test]
    fn test_args_and_output_path() {
        let whisper = WhisperCli::new("whisper", "base", Some("zh".to_string()), "/work/downloads");
        let media = Path::new("/work/downloads/temp_video.mp4");

        let args = whisper.build_args(media);
        assert_eq!(args[0], "/work/downloads/temp_video.mp4");
        assert!(args.windows(2).any(|w| w[0] == "--model" && w[1] == "base"));
        assert!(args.windows(2).any(|w| w[0] == "--fp16" && w[1] == "False"));
        assert!(args.windows(2).any(|w| w[0] == "--language" && w[1] == "zh"));

        assert_eq!(
            whisper.json_output_path(media),
            PathBuf::from("/work/downloads/temp_video.json")
        );
        assert_eq!(whisper.model_name(), "base");
    }
}
