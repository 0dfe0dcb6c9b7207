use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::Stage;

/// Receives coarse progress at stage boundaries
pub trait ProgressReporter: Send + Sync {
    fn stage(&self, stage: Stage);

    fn finish(&self, _message: &str) {}

    fn fail(&self, _message: &str) {}
}

/// Swallows all progress
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, stage: Stage) {
        tracing::debug!("{}% {}", stage.percent(), stage.status());
    }
}

/// Terminal progress bar.
///
/// Other bars shown during a run (the font download) must be added through
/// [`BarProgress::bars`] so they stack under the stage bar.
pub struct BarProgress {
    bars: MultiProgress,
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::with_bars(MultiProgress::new())
    }

    fn with_bars(bars: MultiProgress) -> Self {
        let bar = bars.add(ProgressBar::new(100));
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { bars, bar }
    }

    /// Shared display for any extra bars
    pub fn bars(&self) -> MultiProgress {
        self.bars.clone()
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarProgress {
    fn stage(&self, stage: Stage) {
        self.bar.set_position(u64::from(stage.percent()));
        self.bar.set_message(stage.status());
    }

    fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    fn fail(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    #[test]
    fn test_stage_moves_bar() {
        let progress = BarProgress::with_bars(MultiProgress::with_draw_target(
            ProgressDrawTarget::hidden(),
        ));
        progress.stage(Stage::Transcribing);
        assert_eq!(progress.bar.position(), 50);
        assert_eq!(progress.bar.message(), Stage::Transcribing.status());

        progress.finish("Report ready");
        assert!(progress.bar.is_finished());
    }

    #[test]
    fn test_extra_bars_share_display() {
        let progress = BarProgress::with_bars(MultiProgress::with_draw_target(
            ProgressDrawTarget::hidden(),
        ));
        let download = progress.bars().add(ProgressBar::new(10));
        download.inc(4);
        assert_eq!(download.position(), 4);
        assert!(download.is_hidden());
    }
}
