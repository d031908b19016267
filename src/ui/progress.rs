//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar over a known number of package loads.
///
/// Shows an indicatif bar in interactive mode, one line per package
/// otherwise.
pub struct LoadProgress {
    bar: Option<ProgressBar>,
}

impl LoadProgress {
    pub fn new(ctx: &UiContext, total: u64) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total);
            let template = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} Loading packages  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(template);
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Loading {} package(s)...", total);
            None
        };
        Self { bar }
    }

    /// Record one finished package
    pub fn on_package(&self, id: &str, ok: bool) {
        match self.bar {
            Some(ref bar) => {
                bar.set_message(id.to_string());
                bar.inc(1);
            }
            None => {
                let status = if ok { "[OK]" } else { "[FAIL]" };
                println!("  {} {}", status, id);
            }
        }
    }

    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Single-task spinner
pub struct TaskSpinner {
    bar: Option<ProgressBar>,
}

impl TaskSpinner {
    pub fn start(ctx: &UiContext, message: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new_spinner();
            bar.set_message(message.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("{} {}", style("...").dim(), message);
            None
        };
        Self { bar }
    }

    pub fn stop(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
