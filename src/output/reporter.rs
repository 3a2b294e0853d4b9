//! Reporter trait and renderings
//!
//! Reporters turn scan progress into operator-facing lines. Every line carries
//! a [`Severity`], which each rendering maps to its own presentation.

use crate::output::summary::ScanSummary;
use crate::state::{Outcome, Severity};
use std::io::Write;
use std::time::Duration;

/// Receives scan progress, one line at a time
///
/// Implementations only provide [`Reporter::line`]; the other methods format
/// their message and forward to it.
pub trait Reporter {
    /// Emits one line
    fn line(&mut self, severity: Severity, message: &str);

    /// Called once before the first record
    fn scan_started(&mut self, total: usize) {
        self.line(
            Severity::Info,
            &format!("Starting process for {} records...", total),
        );
    }

    /// Called instead of `scan_started` when there is nothing to process
    fn no_records(&mut self) {
        self.line(
            Severity::Warning,
            "No published records found to process.",
        );
    }

    /// Emits the outcome's notes followed by its terminal line
    fn record_finished(&mut self, outcome: &Outcome) {
        for note in &outcome.notes {
            let prefix = match note.severity {
                Severity::Warning => "Warning for",
                _ => "Info for",
            };
            self.line(
                note.severity,
                &format!("{} record #{}: {}", prefix, outcome.record_id, note.message),
            );
        }
        self.line(outcome.severity(), &outcome.to_string());
    }

    /// Called before the pause that follows each record
    fn pausing(&mut self, _pause: Duration) {}

    /// Called once after the last record
    fn scan_finished(&mut self, summary: &ScanSummary) {
        self.line(Severity::Info, &summary.to_string());
        self.line(Severity::Success, "Process complete!");
    }
}

/// Routes report lines through `tracing`
///
/// Info and success lines are logged at INFO, warnings at WARN and errors at
/// ERROR, so the subscriber's level colors carry the severity.
#[derive(Debug, Default)]
pub struct LogReporter;

impl LogReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for LogReporter {
    fn line(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!("{}", message),
            Severity::Success => tracing::info!(outcome = "success", "{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }
    }

    fn pausing(&mut self, pause: Duration) {
        tracing::debug!("Pausing for {}ms...", pause.as_millis());
    }
}

/// Writes tagged plain-text lines (`[OK] ...`, `[ERROR] ...`) to any writer
pub struct LineReporter<W: Write> {
    writer: W,
    write_failed: bool,
}

impl<W: Write> LineReporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            write_failed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Reporter for LineReporter<W> {
    fn line(&mut self, severity: Severity, message: &str) {
        let written = writeln!(self.writer, "[{}] {}", severity.tag(), message)
            .and_then(|_| self.writer.flush());

        // Only complain once; a broken log file must not stop the scan
        if let Err(e) = written {
            if !self.write_failed {
                tracing::warn!("Failed to write report line: {}", e);
                self.write_failed = true;
            }
        }
    }
}

/// Fans every line out to several reporters
impl Reporter for Vec<Box<dyn Reporter>> {
    fn line(&mut self, severity: Severity, message: &str) {
        for reporter in self.iter_mut() {
            reporter.line(severity, message);
        }
    }

    fn pausing(&mut self, pause: Duration) {
        for reporter in self.iter_mut() {
            reporter.pausing(pause);
        }
    }
}
