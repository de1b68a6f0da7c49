use std::io::{self, Write};

use crate::cli::VerbosityLevel;
use crate::error::{DirectoryOp, PathRole, RunError};
use crate::messages::{Locale, Messages};

/// Renders aborting errors for the user, in the configured language
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
    locale: Locale,
    show_timestamps: bool,
}

impl ErrorReporter {
    /// Create a new error reporter with specified verbosity
    pub fn new(verbosity: VerbosityLevel, locale: Locale) -> Self {
        Self {
            verbosity,
            locale,
            show_timestamps: false,
        }
    }

    /// Create a new error reporter with additional options
    pub fn with_options(verbosity: VerbosityLevel, locale: Locale, show_timestamps: bool) -> Self {
        Self {
            verbosity,
            locale,
            show_timestamps,
        }
    }

    fn messages(&self) -> &'static Messages {
        self.locale.messages()
    }

    /// Stage-specific message with the underlying cause
    pub fn message(&self, error: &RunError) -> String {
        let messages = self.messages();
        let stage = match error {
            RunError::RequiredArgumentMissing { .. } => return messages.required_paths.to_string(),
            RunError::HomeResolution {
                role: PathRole::Document,
                ..
            } => messages.processing_xml_path.to_string(),
            RunError::HomeResolution {
                role: PathRole::Schema,
                ..
            } => messages.processing_xsd_path.to_string(),
            RunError::WorkingDirectory { op, path, .. } => match op {
                DirectoryOp::Capture => messages.getting_current_dir.to_string(),
                DirectoryOp::Change => match path {
                    Some(path) => format!("{} {}", messages.changing_dir, path.display()),
                    None => messages.changing_dir.to_string(),
                },
                DirectoryOp::Restore => messages.restoring_dir.to_string(),
            },
            RunError::SchemaRead { .. } => messages.reading_xsd.to_string(),
            RunError::SchemaParse { .. } => messages.parsing_xsd.to_string(),
            RunError::DocumentRead { .. } => messages.reading_xml.to_string(),
            RunError::DocumentParse { .. } => messages.parsing_xml.to_string(),
            RunError::ValidationEngine { .. } => messages.validation_engine.to_string(),
            RunError::Config(_) => messages.configuration.to_string(),
        };
        format!("{}: {}", stage, error.cause())
    }

    /// Full text for the configured verbosity
    pub fn format_error(&self, error: &RunError) -> String {
        let mut output = self.format_error_normal(error);

        if self.verbosity >= VerbosityLevel::Verbose
            && let Some(suggestion) = self.suggestion(error)
        {
            output.push('\n');
            output.push_str(suggestion);
        }

        if self.verbosity == VerbosityLevel::Debug {
            output.push_str(&self.format_debug_details(error));
        }

        output
    }

    /// Write the error to `out`
    pub fn report<W: Write>(&self, error: &RunError, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.format_error(error))
    }

    fn format_error_normal(&self, error: &RunError) -> String {
        let timestamp = if self.show_timestamps {
            format!("[{}] ", chrono::Local::now().format("%H:%M:%S"))
        } else {
            String::new()
        };

        let mut output = format!("{}{}", timestamp, self.message(error));
        if matches!(error, RunError::RequiredArgumentMissing { .. }) {
            output.push('\n');
            output.push_str(self.messages().usage);
        }
        output
    }

    fn format_debug_details(&self, error: &RunError) -> String {
        let mut output = format!("\nDebug Info: {:?}", error);

        let mut current: &dyn std::error::Error = error;
        let mut level = 0;
        while let Some(source) = current.source() {
            if level == 0 {
                output.push_str("\nError Chain:");
            }
            output.push_str(&format!("\n  {}: {}", level + 1, source));
            current = source;
            level += 1;
        }

        output
    }

    fn suggestion(&self, error: &RunError) -> Option<&'static str> {
        let messages = self.messages();
        match error {
            RunError::SchemaRead { .. } | RunError::DocumentRead { .. } => Some(messages.suggest_file),
            RunError::SchemaParse { .. } => Some(messages.suggest_schema),
            RunError::DocumentParse { .. } => Some(messages.suggest_document),
            RunError::WorkingDirectory { .. } => Some(messages.suggest_directory),
            RunError::Config(_) => Some(messages.suggest_config),
            _ => None,
        }
    }
}
