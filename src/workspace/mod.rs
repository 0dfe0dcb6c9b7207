use std::io;
use std::path::{Path, PathBuf};

/// Stem yt-dlp writes the downloaded video under
pub const VIDEO_STEM: &str = "temp_video";

const DOWNLOADS_DIR: &str = "downloads";
const SCREENSHOTS_DIR: &str = "screenshots";
const TRANSCRIPT_FILE: &str = "transcript.txt";
const REPORT_FILE: &str = "Analysis_Report.pdf";

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "mov", "avi", "m4v"];

/// Fixed artifact layout under one working directory.
///
/// Every run writes to the same file names, so two runs must never share a
/// working directory at the same time.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join(DOWNLOADS_DIR)
    }

    /// yt-dlp output template, extension chosen by the downloader
    pub fn video_template(&self) -> PathBuf {
        self.downloads_dir().join(format!("{}.%(ext)s", VIDEO_STEM))
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.downloads_dir().join(TRANSCRIPT_FILE)
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.downloads_dir().join(SCREENSHOTS_DIR)
    }

    pub fn report_path(&self) -> PathBuf {
        self.downloads_dir().join(REPORT_FILE)
    }

    /// Create the download and screenshot directories (idempotent)
    pub fn prepare(&self) -> io::Result<()> {
        fs_err::create_dir_all(self.screenshot_dir())
    }

    /// Find the downloaded video by its fixed stem
    pub fn find_video(&self) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = Self::video_files(&self.downloads_dir()).collect();
        candidates.sort();
        candidates.into_iter().next()
    }

    /// Delete videos left over from an earlier run
    pub fn clear_video(&self) -> io::Result<usize> {
        let stale: Vec<PathBuf> = Self::video_files(&self.downloads_dir()).collect();
        for path in &stale {
            fs_err::remove_file(path)?;
        }
        Ok(stale.len())
    }

    fn video_files(dir: &Path) -> impl Iterator<Item = PathBuf> {
        std::fs::read_dir(dir)
            .into_iter()
            .flatten()
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| is_video_with_stem(path, VIDEO_STEM))
    }
}

fn is_video_with_stem(path: &Path, stem: &str) -> bool {
    let stem_matches = path.file_stem().and_then(|s| s.to_str()) == Some(stem);
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);
    stem_matches && ext_matches && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layout() {
        let ws = Workspace::new("/work");
        assert_eq!(ws.root(), Path::new("/work"));
        assert_eq!(ws.transcript_path(), PathBuf::from("/work/downloads/transcript.txt"));
        assert_eq!(ws.screenshot_dir(), PathBuf::from("/work/downloads/screenshots"));
        assert_eq!(ws.report_path(), PathBuf::from("/work/downloads/Analysis_Report.pdf"));
        assert_eq!(ws.video_template(), PathBuf::from("/work/downloads/temp_video.%(ext)s"));
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        ws.prepare().unwrap();
        ws.prepare().unwrap();
        assert!(ws.screenshot_dir().is_dir());
    }

    #[test]
    fn test_find_video_ignores_sidecar_files() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        ws.prepare().unwrap();

        let downloads = ws.downloads_dir();
        std::fs::write(downloads.join("temp_video.json"), "{}").unwrap();
        std::fs::write(downloads.join("temp_video.mp4.part"), "").unwrap();
        std::fs::write(downloads.join("other.mp4"), "").unwrap();
        assert!(ws.find_video().is_none());

        std::fs::write(downloads.join("temp_video.webm"), "x").unwrap();
        assert_eq!(ws.find_video(), Some(downloads.join("temp_video.webm")));
    }

    #[test]
    fn test_clear_video() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        ws.prepare().unwrap();
        std::fs::write(ws.downloads_dir().join("temp_video.mp4"), "x").unwrap();
        std::fs::write(ws.transcript_path(), "[0:01] hi").unwrap();

        assert_eq!(ws.clear_video().unwrap(), 1);
        assert!(ws.find_video().is_none());
        assert!(ws.transcript_path().exists());
    }

    #[test]
    fn test_find_video_missing_dir() {
        let ws = Workspace::new("/definitely/not/here");
        assert!(ws.find_video().is_none());
    }
}
