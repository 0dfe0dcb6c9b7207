use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Noto Sans TC with TrueType outlines; covers Traditional Chinese headings
const DEFAULT_FONT_URL: &str =
    "https://github.com/google/fonts/raw/main/ofl/notosanstc/NotoSansTC%5Bwght%5D.ttf";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where artifacts are written
    pub workspace: WorkspaceConfig,

    /// External tool binaries
    pub tools: ToolsConfig,

    /// Speech-to-text settings
    pub transcription: TranscriptionConfig,

    /// Display font used for every string in the report
    pub font: FontConfig,

    /// Report texts
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Working directory; `downloads/` and the font live directly under it
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub yt_dlp: String,
    pub ffmpeg: String,
    pub whisper: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Whisper model size. `base` keeps memory and CPU use low.
    pub model: String,

    /// Spoken language (auto-detect if not specified)
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// File name of the cached font, relative to the working directory
    pub file_name: String,

    /// Where to fetch the font when it is missing
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Running header printed at the top of every page
    pub title: String,
    pub transcript_heading: String,
    pub screenshot_heading: String,

    /// Suggested file name when handing the report to the user
    pub download_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: WorkspaceConfig {
                work_dir: PathBuf::from("."),
            },
            tools: ToolsConfig {
                yt_dlp: "yt-dlp".to_string(),
                ffmpeg: "ffmpeg".to_string(),
                whisper: "whisper".to_string(),
            },
            transcription: TranscriptionConfig {
                model: "base".to_string(),
                language: None,
            },
            font: FontConfig {
                file_name: "NotoSansTC-Regular.ttf".to_string(),
                url: DEFAULT_FONT_URL.to_string(),
            },
            report: ReportConfig {
                title: "Stock Analysis Report".to_string(),
                transcript_heading: "【逐字稿內容】".to_string(),
                screenshot_heading: "【關鍵截圖】".to_string(),
                download_name: "Stock_Report.pdf".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            if let Err(e) = config.save_to(&config_path) {
                tracing::warn!(
                    "Could not write default config to {}: {:#}",
                    config_path.display(),
                    e
                );
            }
            Ok(config)
        }
    }

    /// Load and validate a specific configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("video-report").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.transcription.model.trim().is_empty() {
            anyhow::bail!("Transcription model must be configured");
        }

        if self.font.file_name.trim().is_empty() {
            anyhow::bail!("Font file name must be configured");
        }

        for (name, bin) in [
            ("yt_dlp", &self.tools.yt_dlp),
            ("ffmpeg", &self.tools.ffmpeg),
            ("whisper", &self.tools.whisper),
        ] {
            if bin.trim().is_empty() {
                anyhow::bail!("Tool path for {} must not be empty", name);
            }
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Working Directory: {}", self.workspace.work_dir.display());
        println!("  Whisper Model: {}", self.transcription.model);
        println!(
            "  Language: {}",
            self.transcription.language.as_deref().unwrap_or("auto-detect")
        );
        println!("  Font: {}", self.font_path().display());
        println!("  Report Title: {}", self.report.title);
        println!("  Download Name: {}", self.report.download_name);
    }

    /// Cached font location inside the working directory
    pub fn font_path(&self) -> PathBuf {
        self.workspace.work_dir.join(&self.font.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_yaml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.yaml");

        let mut original = Config::default();
        original.transcription.language = Some("zh".to_string());
        original.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.transcription.model, "base");
        assert_eq!(loaded.transcription.language.as_deref(), Some("zh"));
        assert_eq!(loaded.report.screenshot_heading, original.report.screenshot_heading);
        assert_eq!(loaded.workspace.work_dir, original.workspace.work_dir);
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.transcription.model = "  ".to_string();
        config.save_to(&path).expect("save");

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "workspace: [not, a, map").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_default_font_is_truetype() {
        let config = Config::default();
        assert!(config.font.file_name.ends_with(".ttf"));
        assert!(config.font.url.ends_with(".ttf"));
    }

    #[test]
    fn test_font_path_is_under_work_dir() {
        let mut config = Config::default();
        config.workspace.work_dir = PathBuf::from("/srv/reports");
        assert_eq!(
            config.font_path(),
            PathBuf::from("/srv/reports/NotoSansTC-Regular.ttf")
        );
    }
}
