//! Report rendering.
//!
//! Turns a finished run into the lines printed on stdout and maps it to the
//! process exit status. No validation logic lives here.

use serde_json::json;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::config::Config;
use crate::engine::Violation;
use crate::error::RunError;
use crate::messages::{Locale, Messages};
use crate::pipeline::RunReport;
use crate::validator::ValidationOutcome;

/// Output formatter for run reports
pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    locale: Locale,
    show_colors: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel, locale: Locale) -> Self {
        Self {
            format,
            verbosity,
            locale,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let output = Self::new(config.output.format, config.verbosity(), config.output.locale);
        let show_colors = output.show_colors && config.output.color;
        output.with_colors(show_colors)
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn messages(&self) -> &'static Messages {
        self.locale.messages()
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Render a completed run; empty when there is nothing to print
    pub fn format_report(&self, report: &RunReport) -> String {
        match self.format {
            OutputFormat::Human => self.format_human(&report.outcome),
            OutputFormat::Json => format!("{}\n", self.json_report(report)),
        }
    }

    fn format_human(&self, outcome: &ValidationOutcome) -> String {
        let messages = self.messages();
        match outcome {
            ValidationOutcome::Success => {
                if self.verbosity == VerbosityLevel::Quiet {
                    String::new()
                } else {
                    format!("{}\n", self.colorize(messages.validation_successful, "32"))
                }
            }
            ValidationOutcome::Failure(violations) => {
                let mut output = format!("{}\n", self.colorize(messages.validation_failed, "31"));
                for (index, violation) in violations.iter().enumerate() {
                    output.push_str(&self.format_violation(index + 1, violation));
                    output.push('\n');
                }
                output
            }
        }
    }

    /// `"<n>. <message>"`, plus the location in verbose mode
    pub fn format_violation(&self, number: usize, violation: &Violation) -> String {
        let mut line = format!("{}. {}", number, violation.message);
        if self.verbosity >= VerbosityLevel::Verbose
            && let Some(line_no) = violation.line
        {
            let messages = self.messages();
            match violation.column {
                Some(column) => line.push_str(&format!(
                    " ({} {}, {} {})",
                    messages.line, line_no, messages.column, column
                )),
                None => line.push_str(&format!(" ({} {})", messages.line, line_no)),
            }
        }
        line
    }

    fn json_report(&self, report: &RunReport) -> serde_json::Value {
        let violations: Vec<_> = report
            .outcome
            .violations()
            .iter()
            .enumerate()
            .map(|(index, violation)| {
                json!({
                    "index": index + 1,
                    "message": violation.message,
                    "line": violation.line,
                    "column": violation.column,
                })
            })
            .collect();

        json!({
            "valid": report.outcome.is_success(),
            "schema": report.schema.display().to_string(),
            "document": report.document.display().to_string(),
            "violations": violations,
        })
    }

    /// JSON object for an aborted run; `message` is the localized error text
    pub fn format_json_abort(&self, error: &RunError, message: &str) -> String {
        let value = json!({
            "valid": false,
            "error": {
                "kind": error.kind().as_str(),
                "message": message,
            },
        });
        format!("{}\n", value)
    }
}

/// Process exit status for a run
pub fn exit_code<T>(result: &Result<RunReport, T>) -> i32 {
    match result {
        Ok(report) if report.outcome.is_success() => 0,
        _ => 1,
    }
}
