//! The schema engine seam.
//!
//! The orchestration layer never looks inside a compiled schema or a parsed
//! document: it only moves the handles between the capabilities below and
//! drops them when the run is over.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// Severity reported by the engine for a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// One point of non-conformance between a document and a schema.
///
/// Numbering belongs to the report, so a violation carries none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub file: Option<String>,
}

impl Violation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
            file: None,
        }
    }

    pub fn at(mut self, line: u32, column: Option<u32>) -> Self {
        self.line = Some(line);
        self.column = column;
        self
    }
}

/// What the engine found while validating one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineReport {
    /// Errors in emission order
    pub violations: Vec<Violation>,
    /// Diagnostics below error severity
    pub warnings: Vec<Violation>,
}

/// Compile, parse and validate capabilities of an XSD implementation.
///
/// Handles are released when dropped.
pub trait SchemaEngine {
    type Schema;
    type Document;

    /// Compile schema text.
    ///
    /// With `base == None`, relative `include`/`import` locations resolve
    /// against the process working directory; otherwise against `base`.
    fn compile_schema(&self, bytes: &[u8], base: Option<&Path>) -> EngineResult<Self::Schema>;

    /// Parse a document. `name` is only used in diagnostics.
    fn parse_document(&self, bytes: &[u8], name: Option<&Path>) -> EngineResult<Self::Document>;

    fn validate(
        &self,
        schema: &Self::Schema,
        document: &Self::Document,
    ) -> EngineResult<EngineReport>;
}
