//! CLI presenter for output formatting

use std::io::{self, Write};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::SessionSnapshot;
use crate::domain::catalog::RecordingRecord;
use crate::domain::recording::Duration;
use crate::domain::session::SessionState;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        self.status_line(format!("{} {}", "ℹ".cyan(), message));
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        self.status_line(format!("{} {}", "✓".green(), message));
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        self.status_line(format!("{} {}", "⚠".yellow(), message));
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        self.status_line(format!("{} {}", "✗".red(), message));
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Output text to stdout without newline
    pub fn output_inline(&self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Print one catalog entry
    pub fn record(&self, record: &RecordingRecord) {
        println!("{}", Self::format_record(record));
    }

    pub fn format_record(record: &RecordingRecord) -> String {
        format!(
            "{}  {}  {}",
            record
                .created_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .dimmed(),
            record.display_name.bold(),
            record.location_ref
        )
    }

    /// Spinner text for a running session
    pub fn format_session(snapshot: SessionSnapshot, limit: Duration) -> String {
        let elapsed = Duration::from_secs(snapshot.elapsed_seconds).as_clock();
        let limit = limit.as_clock();
        match snapshot.state {
            SessionState::Recording => format!("{} {} / {}", "Recording".red(), elapsed, limit),
            SessionState::Paused => format!(
                "{} {} / {}  (r = resume, s = stop)",
                "Paused".yellow(),
                elapsed,
                limit
            ),
            SessionState::Idle => format!("Stopped at {}", elapsed),
        }
    }

    pub fn update_session(&self, snapshot: SessionSnapshot, limit: Duration) {
        self.update_spinner(&Self::format_session(snapshot, limit));
    }

    /// Status lines go above an active spinner rather than through it
    fn status_line(&self, line: String) {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn session_line_shows_elapsed_and_limit() {
        let line = Presenter::format_session(
            SessionSnapshot {
                state: SessionState::Recording,
                elapsed_seconds: 75,
            },
            Duration::from_secs(600),
        );
        assert!(line.contains("01:15 / 10:00"));
    }

    #[test]
    fn paused_line_mentions_resume() {
        let line = Presenter::format_session(
            SessionSnapshot {
                state: SessionState::Paused,
                elapsed_seconds: 3,
            },
            Duration::from_secs(3600),
        );
        assert!(line.contains("00:03"));
        assert!(line.contains("resume"));
    }

    #[test]
    fn record_line_has_name_and_location() {
        let record = RecordingRecord::new(
            "/data/recordings/a.flac".into(),
            Some("Team sync".to_string()),
            Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap(),
        );
        let line = Presenter::format_record(&record);
        assert!(line.contains("Team sync"));
        assert!(line.ends_with("/data/recordings/a.flac"));
    }
}
