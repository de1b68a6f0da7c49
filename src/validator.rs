//! Validation of a parsed document against a compiled schema.
//!
//! A document that breaks the schema is an ordinary outcome, not an error:
//! only a failure of the engine itself aborts the run.

use serde::Serialize;

use crate::engine::{SchemaEngine, Violation};
use crate::error::{Result, RunError};

/// Result of one validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "violations", rename_all = "lowercase")]
pub enum ValidationOutcome {
    Success,
    /// Violations in engine emission order; never empty
    Failure(Vec<Violation>),
}

impl ValidationOutcome {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            ValidationOutcome::Success
        } else {
            ValidationOutcome::Failure(violations)
        }
    }

    /// Check if the document conforms to the schema
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationOutcome::Success)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationOutcome::Success => &[],
            ValidationOutcome::Failure(violations) => violations,
        }
    }
}

pub struct Validator<'a, E: SchemaEngine> {
    engine: &'a E,
}

impl<'a, E: SchemaEngine> Validator<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    pub fn validate(&self, schema: &E::Schema, document: &E::Document) -> Result<ValidationOutcome> {
        let report = self
            .engine
            .validate(schema, document)
            .map_err(|err| RunError::ValidationEngine {
                details: err.to_string(),
            })?;

        for warning in &report.warnings {
            tracing::warn!(
                line = warning.line,
                column = warning.column,
                "{}",
                warning.message
            );
        }

        let outcome = ValidationOutcome::from_violations(report.violations);
        tracing::info!(
            valid = outcome.is_success(),
            violations = outcome.violations().len(),
            "validation finished"
        );
        Ok(outcome)
    }
}
