use anyhow::Result;
use clap::Parser;
use console::style;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_report::pipeline::{read_report, BarProgress, SilentProgress};
use video_report::utils::{self, format_duration, format_file_size};
use video_report::{Cli, Commands, Config, ProgressReporter, ReportPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "video_report=debug"
    } else {
        "video_report=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Generate {
            url,
            interval,
            output,
        } => {
            let missing_deps = utils::check_dependencies(&config.tools).await;
            if !missing_deps.is_empty() {
                eprintln!("{}", style("Dependency check warnings:").yellow());
                for dep in missing_deps {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (Continuing anyway - tools may be available)");
            }

            // The font download bar stacks under the stage bar
            let stage_bar = (!cli.quiet).then(BarProgress::new);
            let bars = stage_bar.as_ref().map(BarProgress::bars);
            let progress: Box<dyn ProgressReporter> = match stage_bar {
                Some(bar) => Box::new(bar),
                None => Box::new(SilentProgress),
            };

            let pipeline = ReportPipeline::new(&config, bars);
            let started = Instant::now();

            tracing::info!("Generating report for {} every {}s", url, interval);

            let report = match pipeline.run(&url, interval, progress.as_ref()).await {
                Ok(report) => report,
                Err(e) => {
                    progress.fail("Failed");
                    eprintln!("{} {}", style("Error:").red().bold(), e);
                    std::process::exit(1);
                }
            };
            progress.finish("Report ready");

            let bytes = read_report(&report.path)?;
            println!(
                "{} {} ({}, {} pages, {})",
                style("Report saved to:").green().bold(),
                report.path.display(),
                format_file_size(bytes.len() as u64),
                report.summary.pages,
                format_duration(started.elapsed().as_secs_f64())
            );

            if let Some(path) = output {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs_err::create_dir_all(parent)?;
                }
                fs_err::write(&path, &bytes)?;
                println!("Copied to: {}", path.display());
            } else {
                println!("Suggested file name: {}", config.report.download_name);
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!("Edit it directly, or run with --show to print the current values.");
            }
        }
        Commands::Check => {
            let missing = utils::check_dependencies(&config.tools).await;
            if missing.is_empty() {
                println!("{}", style("All external tools found.").green());
            } else {
                println!("{}", style("Missing tools:").red().bold());
                for dep in &missing {
                    println!("   • {}", dep);
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
