use anyhow::Result;
use url::Url;

/// Accepted screenshot interval, in seconds
pub const MIN_INTERVAL_SECS: u32 = 30;
pub const MAX_INTERVAL_SECS: u32 = 120;
pub const DEFAULT_INTERVAL_SECS: u32 = 60;

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        anyhow::bail!("A video URL is required");
    }

    let parsed = Url::parse(trimmed).map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed.to_string())
}

/// Reject intervals outside the accepted range
pub fn validate_interval(seconds: u32) -> Result<u32> {
    if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&seconds) {
        anyhow::bail!(
            "Screenshot interval must be between {} and {} seconds, got {}",
            MIN_INTERVAL_SECS,
            MAX_INTERVAL_SECS,
            seconds
        );
    }
    Ok(seconds)
}

/// Human-readable size, binary units
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Host of `url` without a leading `www.`, for log lines
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(|host| {
        host.strip_prefix("www.").unwrap_or(host).to_string()
    })
}

/// Check if the current environment has required tools
pub async fn check_dependencies(tools: &crate::config::ToolsConfig) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(&tools.yt_dlp, "--version").await {
        missing.push(format!("{} - required to download videos", tools.yt_dlp));
    }

    if !check_command_available(&tools.ffmpeg, "-version").await {
        missing.push(format!("{} - required to capture screenshots", tools.ffmpeg));
    }

    if !check_command_available(&tools.whisper, "--help").await {
        missing.push(format!(
            "{} - required for transcription (pip install openai-whisper)",
            tools.whisper
        ));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, probe_arg: &str) -> bool {
    use std::process::Stdio;
    use tokio::process::Command;

    Command::new(command)
        .arg(probe_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://www.youtube.com/watch?v=123"),
            Some("youtube.com".to_string())
        );
        assert_eq!(extract_domain("https://youtu.be/abc"), Some("youtu.be".to_string()));
        assert_eq!(extract_domain("invalid-url"), None);
    }

    #[test]
    fn test_validate_and_normalize_url() {
        assert!(validate_and_normalize_url("https://example.com").is_ok());
        assert!(validate_and_normalize_url("  http://example.com/watch?v=1 ").is_ok());
        assert!(validate_and_normalize_url("ftp://example.com").is_err());
        assert!(validate_and_normalize_url("not-a-url").is_err());
        assert!(validate_and_normalize_url("   ").is_err());
    }

    #[test]
    fn test_validate_interval() {
        assert!(validate_interval(0).is_err());
        assert!(validate_interval(29).is_err());
        assert_eq!(validate_interval(30).unwrap(), 30);
        assert_eq!(validate_interval(DEFAULT_INTERVAL_SECS).unwrap(), 60);
        assert_eq!(validate_interval(120).unwrap(), 120);
        assert!(validate_interval(121).is_err());
    }
}
