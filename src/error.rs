use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Which of the two input files a path error concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRole {
    Document,
    Schema,
}

impl fmt::Display for PathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRole::Document => f.write_str("XML"),
            PathRole::Schema => f.write_str("XSD"),
        }
    }
}

/// Working directory operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryOp {
    Capture,
    Change,
    Restore,
}

impl fmt::Display for DirectoryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryOp::Capture => f.write_str("read current directory"),
            DirectoryOp::Change => f.write_str("change directory"),
            DirectoryOp::Restore => f.write_str("restore original directory"),
        }
    }
}

/// Every failure that aborts a validation run.
///
/// Schema violations are not errors: they travel as
/// [`ValidationOutcome::Failure`](crate::validator::ValidationOutcome).
#[derive(Error, Debug)]
pub enum RunError {
    #[error("required arguments missing: {}", .missing.join(", "))]
    RequiredArgumentMissing { missing: Vec<&'static str> },

    #[error("cannot expand {role} path {path}: home directory unavailable")]
    HomeResolution { role: PathRole, path: String },

    #[error("cannot {op}{}: {source}", .path.as_ref().map(|p| format!(" {}", p.display())).unwrap_or_default())]
    WorkingDirectory {
        op: DirectoryOp,
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read schema {path}: {source}")]
    SchemaRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse schema {path}: {details}")]
    SchemaParse { path: PathBuf, details: String },

    #[error("cannot read document {path}: {source}")]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse document {path}: {details}")]
    DocumentParse { path: PathBuf, details: String },

    #[error("validation engine failure: {details}")]
    ValidationEngine { details: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Stable, machine-readable name of a [`RunError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RequiredArgumentMissing,
    HomeResolution,
    WorkingDirectory,
    SchemaRead,
    SchemaParse,
    DocumentRead,
    DocumentParse,
    ValidationEngine,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RequiredArgumentMissing => "required_argument_missing",
            ErrorKind::HomeResolution => "home_resolution",
            ErrorKind::WorkingDirectory => "working_directory",
            ErrorKind::SchemaRead => "schema_read",
            ErrorKind::SchemaParse => "schema_parse",
            ErrorKind::DocumentRead => "document_read",
            ErrorKind::DocumentParse => "document_parse",
            ErrorKind::ValidationEngine => "validation_engine",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::RequiredArgumentMissing { .. } => ErrorKind::RequiredArgumentMissing,
            RunError::HomeResolution { .. } => ErrorKind::HomeResolution,
            RunError::WorkingDirectory { .. } => ErrorKind::WorkingDirectory,
            RunError::SchemaRead { .. } => ErrorKind::SchemaRead,
            RunError::SchemaParse { .. } => ErrorKind::SchemaParse,
            RunError::DocumentRead { .. } => ErrorKind::DocumentRead,
            RunError::DocumentParse { .. } => ErrorKind::DocumentParse,
            RunError::ValidationEngine { .. } => ErrorKind::ValidationEngine,
            RunError::Config(_) => ErrorKind::Config,
        }
    }

    /// The underlying cause, without the stage description
    pub fn cause(&self) -> String {
        match self {
            RunError::RequiredArgumentMissing { missing } => missing.join(", "),
            RunError::HomeResolution { path, .. } => {
                format!("{}: home directory unavailable", path)
            }
            RunError::WorkingDirectory { source, .. }
            | RunError::SchemaRead { source, .. }
            | RunError::DocumentRead { source, .. } => source.to_string(),
            RunError::SchemaParse { details, .. }
            | RunError::DocumentParse { details, .. }
            | RunError::ValidationEngine { details } => details.clone(),
            RunError::Config(err) => err.to_string(),
        }
    }
}

/// Failures reported by the schema engine itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("input of {size} bytes exceeds the engine limit")]
    InputTooLarge { size: usize },

    #[error("path is not representable as a C string: {path}")]
    InvalidPath { path: PathBuf },

    #[error("Schema parsing failed: {}", join_diagnostics(.diagnostics, "null pointer returned"))]
    SchemaParseFailed { diagnostics: Vec<String> },

    #[error("Document parsing failed: {}", join_diagnostics(.diagnostics, "not well-formed"))]
    DocumentParseFailed { diagnostics: Vec<String> },

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Schema validation internal error: code {code}")]
    InternalError { code: i32 },

    #[error("Schema validation failed with code {code} but reported no diagnostics")]
    MissingDiagnostics { code: i32 },
}

fn join_diagnostics(diagnostics: &[String], fallback: &str) -> String {
    if diagnostics.is_empty() {
        fallback.to_string()
    } else {
        diagnostics.join("; ")
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RunError>;

/// Engine result type alias
pub type EngineResult<T> = std::result::Result<T, EngineError>;
