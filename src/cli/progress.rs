//! Console Progress Renderer
//!
//! `ProgressSink` implementation that renders stage checkpoints as styled
//! terminal lines. A store-backed sink can be layered next to this one when
//! an external poller also needs the record.

use console::style;

use crate::progress::{AnalysisStatus, ProgressSink};

/// Renders progress reports to stdout/stderr
pub struct ConsoleProgress {
    quiet: bool,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, stage: &str, progress: u8, details: Option<&str>) {
        if self.quiet {
            return;
        }
        let detail = details.map(|d| format!(" ({})", d)).unwrap_or_default();
        println!(
            "{} {:>3}% {}{}",
            style("▸").cyan().bold(),
            progress,
            style(stage).bold(),
            style(detail).dim()
        );
    }

    fn on_status(&self, status: AnalysisStatus) {
        if self.quiet {
            return;
        }
        if status == AnalysisStatus::Completed {
            println!("{} analysis complete", style("✓").green().bold());
        }
    }

    fn on_failed(&self, details: &str) {
        eprintln!("{} analysis failed: {}", style("✗").red().bold(), details);
    }
}

/// Fans one report out to several sinks
pub struct TeeSink {
    sinks: Vec<Box<dyn ProgressSink>>,
}

impl TeeSink {
    pub fn new(sinks: Vec<Box<dyn ProgressSink>>) -> Self {
        Self { sinks }
    }
}

impl ProgressSink for TeeSink {
    fn on_progress(&self, stage: &str, progress: u8, details: Option<&str>) {
        for sink in &self.sinks {
            sink.on_progress(stage, progress, details);
        }
    }

    fn on_status(&self, status: AnalysisStatus) {
        for sink in &self.sinks {
            sink.on_status(status);
        }
    }

    fn on_failed(&self, details: &str) {
        for sink in &self.sinks {
            sink.on_failed(details);
        }
    }
}
