//! PDF report assembly from a transcript file and a screenshot directory.
//!
//! Missing or unreadable inputs only thin out the document; the font and the
//! output file are the only things that can fail an assembly.

use std::path::{Path, PathBuf};

pub mod layout;
pub mod pdf;

pub use layout::{build_layout, ReportLayout, ScreenshotInput, Section};

use crate::config::ReportConfig;

const SCREENSHOT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(thiserror::Error, Debug)]
pub enum AssemblyError {
    #[error("Cannot load font {path}: {reason}")]
    FontLoad { path: PathBuf, reason: String },

    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("Cannot write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Texts printed in the report
#[derive(Debug, Clone)]
pub struct ReportStyle {
    pub title: String,
    pub transcript_heading: String,
    pub screenshot_heading: String,
    /// Optional line under the transcript heading, e.g. a generation time
    pub generated_at: Option<String>,
}

impl ReportStyle {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            title: config.title.clone(),
            transcript_heading: config.transcript_heading.clone(),
            screenshot_heading: config.screenshot_heading.clone(),
            generated_at: None,
        }
    }

    pub fn with_generated_at(mut self, generated_at: impl Into<String>) -> Self {
        self.generated_at = Some(generated_at.into());
        self
    }
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self::from_config(&crate::config::Config::default().report)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblySummary {
    pub pages: usize,
    pub transcript_blocks: usize,
    pub screenshots: usize,
    pub screenshot_pages: usize,
    pub images_embedded: usize,
}

/// Build the report at `output_path`.
pub fn assemble(
    transcript_path: &Path,
    screenshot_dir: &Path,
    output_path: &Path,
    font_path: &Path,
    style: &ReportStyle,
) -> Result<AssemblySummary, AssemblyError> {
    let transcript = read_transcript(transcript_path);
    let screenshots = collect_screenshots(screenshot_dir);

    let layout = build_layout(transcript.as_deref(), &screenshots, style);
    let (bytes, stats) = pdf::render(&layout, font_path, style)?;

    fs_err::write(output_path, &bytes).map_err(|source| AssemblyError::Write {
        path: output_path.to_path_buf(),
        source,
    })?;

    let summary = AssemblySummary {
        pages: stats.pages,
        transcript_blocks: layout.transcript_blocks().len(),
        screenshots: screenshots.len(),
        screenshot_pages: layout.page_count(Section::Screenshots),
        images_embedded: stats.images_embedded,
    };
    tracing::info!(
        "Report written to {} ({} pages, {} transcript lines, {}/{} screenshots)",
        output_path.display(),
        summary.pages,
        summary.transcript_blocks,
        summary.images_embedded,
        summary.screenshots
    );

    Ok(summary)
}

/// Transcript contents, with invalid UTF-8 replaced. `None` if unreadable.
pub fn read_transcript(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            tracing::warn!(
                "Transcript {} unreadable, leaving section empty: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Screenshots in capture order, each with its pixel size when readable
pub fn collect_screenshots(dir: &Path) -> Vec<ScreenshotInput> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Screenshot directory {} unreadable: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_screenshot_extension(path))
        .collect();
    paths.sort_by_key(|path| frame_sort_key(path));

    paths
        .into_iter()
        .map(|path| {
            let dimensions = match image::image_dimensions(&path) {
                Ok(dimensions) => Some(dimensions),
                Err(e) => {
                    tracing::warn!("Skipping image {}: {}", path.display(), e);
                    None
                }
            };
            ScreenshotInput { path, dimensions }
        })
        .collect()
}

fn has_screenshot_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SCREENSHOT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Orders `img_999.jpg` before `img_1000.jpg`.
///
/// Names split into a prefix and a trailing number; those without a number
/// sort by name ahead of numbered ones sharing the prefix.
fn frame_sort_key(path: &Path) -> (String, Option<u64>, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = stem[prefix.len()..].parse::<u64>().ok();
    (prefix.to_string(), number, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_frame_sort_key_orders_past_999() {
        let mut names = vec!["img_1000.jpg", "img_002.jpg", "img_999.jpg", "img_010.jpg"];
        names.sort_by_key(|n| frame_sort_key(Path::new(n)));
        assert_eq!(names, vec!["img_002.jpg", "img_010.jpg", "img_999.jpg", "img_1000.jpg"]);
    }

    #[test]
    fn test_collect_screenshots_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        write_jpeg(&dir.path().join("img_002.jpg"), 32, 18);
        write_jpeg(&dir.path().join("img_001.jpg"), 32, 18);
        std::fs::write(dir.path().join("img_003.jpg"), b"not really a jpeg").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();

        let shots = collect_screenshots(dir.path());
        let names: Vec<String> = shots
            .iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["img_001.jpg", "img_002.jpg", "img_003.jpg"]);
        assert_eq!(shots[0].dimensions, Some((32, 18)));
        assert_eq!(shots[2].dimensions, None);
    }

    #[test]
    fn test_missing_inputs_degrade() {
        let dir = tempdir().unwrap();
        assert!(read_transcript(&dir.path().join("nope.txt")).is_none());
        assert!(collect_screenshots(&dir.path().join("nope")).is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transcript.txt");
        std::fs::write(&path, b"[0:01] caf\xff\n").unwrap();

        let text = read_transcript(&path).unwrap();
        assert_eq!(layout::sanitize_line(text.trim()), "[0:01] caf?");
    }

    #[test]
    fn test_missing_font_is_fatal() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("report.pdf");

        let err = assemble(
            &dir.path().join("transcript.txt"),
            &dir.path().join("screenshots"),
            &output,
            &dir.path().join("missing-font.otf"),
            &ReportStyle::default(),
        )
        .unwrap_err();

        assert!(matches!(err, AssemblyError::FontLoad { .. }));
        assert!(!output.exists());
    }
}
