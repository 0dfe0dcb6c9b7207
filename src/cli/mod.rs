use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::{DEFAULT_INTERVAL_SECS, MAX_INTERVAL_SECS, MIN_INTERVAL_SECS};

#[derive(Parser)]
#[command(
    name = "video-report",
    about = "Video Report - Turn a video URL into a PDF with a transcript and screenshots",
    version,
    long_about = "Downloads a video with yt-dlp, transcribes it with Whisper, captures a \
                  screenshot every few seconds with ffmpeg and packs everything into one \
                  PDF report."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a PDF report from a video URL
    Generate {
        /// Video URL (YouTube or anything yt-dlp understands)
        #[arg(value_name = "URL")]
        url: String,

        /// Seconds between screenshots
        #[arg(
            short,
            long,
            value_name = "SECONDS",
            default_value_t = DEFAULT_INTERVAL_SECS,
            value_parser = clap::value_parser!(u32)
                .range(MIN_INTERVAL_SECS as i64..=MAX_INTERVAL_SECS as i64)
        )]
        interval: u32,

        /// Copy the finished report to this path
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Check that the external tools are installed
    Check,
}
