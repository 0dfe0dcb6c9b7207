//! Local copies of remote assets, fetched on first use.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Downloads a remote resource to a local path
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Make sure `target` exists, fetching it from `url` if it does not.
///
/// Presence of the file is the whole cache check: an existing file is
/// returned untouched and nothing is fetched. Not safe to call from two
/// runs sharing one working directory at the same time.
pub async fn ensure_resource(
    target: &Path,
    url: &str,
    fetcher: &dyn ResourceFetcher,
) -> Result<PathBuf> {
    if target.is_file() {
        tracing::debug!("Resource already present: {}", target.display());
        return Ok(target.to_path_buf());
    }

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs_err::create_dir_all(parent)?;
        }
    }

    tracing::info!("Fetching {} -> {}", url, target.display());
    fetcher
        .fetch(url, target)
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    if !target.is_file() {
        anyhow::bail!("Fetcher reported success but {} is missing", target.display());
    }

    Ok(target.to_path_buf())
}

/// Streams resources over HTTP(S)
pub struct HttpFetcher {
    client: reqwest::Client,
    /// Bars are drawn here, below any bar already on screen; none when `None`
    bars: Option<MultiProgress>,
}

impl HttpFetcher {
    pub fn new(bars: Option<MultiProgress>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bars,
        }
    }

    fn download_bar(&self, total_bytes: u64) -> ProgressBar {
        match &self.bars {
            Some(bars) => bars.add(ProgressBar::new(total_bytes)),
            None => ProgressBar::hidden(),
        }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download resource: HTTP {}", response.status());
        }

        let progress = self.download_bar(response.content_length().unwrap_or(0));
        progress.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                     {bytes}/{total_bytes} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message("Downloading font...");

        // Stream into a sibling file so an interrupted download never looks cached
        let partial = partial_path(dest);
        let mut file = fs_err::File::create(&partial)?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
            progress.set_position(downloaded);
        }
        file.flush()?;
        drop(file);

        fs_err::rename(&partial, dest)?;
        progress.finish_and_clear();
        tracing::debug!("Fetched {} bytes into {}", downloaded, dest.display());

        Ok(())
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_existing_resource_is_not_fetched() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("font.otf");
        std::fs::write(&target, b"font").unwrap();

        let mut fetcher = MockResourceFetcher::new();
        fetcher.expect_fetch().times(0);

        let first = ensure_resource(&target, "https://fonts.test/a.otf", &fetcher).await.unwrap();
        let second = ensure_resource(&target, "https://fonts.test/a.otf", &fetcher).await.unwrap();
        assert_eq!(first, target);
        assert_eq!(second, target);
    }

    #[tokio::test]
    async fn test_missing_resource_fetched_once() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("font.otf");

        let mut fetcher = MockResourceFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_, dest| {
                std::fs::write(dest, b"font")?;
                Ok(())
            });

        ensure_resource(&target, "https://fonts.test/a.otf", &fetcher).await.unwrap();
        ensure_resource(&target, "https://fonts.test/a.otf", &fetcher).await.unwrap();
        assert!(target.is_file());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("font.otf");

        let mut fetcher = MockResourceFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_, _| Err(anyhow::anyhow!("connection refused")));

        let err = ensure_resource(&target, "https://fonts.test/a.otf", &fetcher)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("connection refused"));
        assert!(!target.exists());
    }

    #[test]
    fn test_download_bar_joins_shared_display() {
        let bars = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        bars.add(ProgressBar::new(100));

        let fetcher = HttpFetcher::new(Some(bars));
        assert_eq!(fetcher.download_bar(2048).length(), Some(2048));

        let quiet = HttpFetcher::new(None);
        assert!(quiet.download_bar(2048).is_hidden());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/NotoSans.otf")),
            PathBuf::from("/tmp/NotoSans.otf.part")
        );
    }
}
