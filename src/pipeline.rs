//! One validation run, from raw path arguments to a [`ValidationOutcome`].
//!
//! ```text
//! Start -> PathsResolved -> SchemaLoaded -> ContextRestored
//!       -> DocumentLoaded -> Validated -> Reported
//! ```
//!
//! Any step may end the run in `Aborted`. The schema's working-directory
//! context is closed before the document is touched, so an abort never
//! leaves the process in the schema directory.

use std::fmt;
use std::path::PathBuf;

use crate::config::{IncludeResolution, SchemaConfig};
use crate::document_loader::DocumentLoader;
use crate::engine::SchemaEngine;
use crate::error::{ErrorKind, PathRole, Result, RunError};
use crate::paths;
use crate::schema_loader::SchemaLoader;
use crate::validator::{ValidationOutcome, Validator};
use crate::working_context::{AmbientDirectory, ProcessDirectory, WorkingContext};

/// Phase of a validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Start,
    PathsResolved,
    SchemaLoaded,
    ContextRestored,
    DocumentLoaded,
    Validated,
    Reported { valid: bool },
    Aborted(ErrorKind),
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Start => f.write_str("start"),
            RunPhase::PathsResolved => f.write_str("paths_resolved"),
            RunPhase::SchemaLoaded => f.write_str("schema_loaded"),
            RunPhase::ContextRestored => f.write_str("context_restored"),
            RunPhase::DocumentLoaded => f.write_str("document_loaded"),
            RunPhase::Validated => f.write_str("validated"),
            RunPhase::Reported { valid: true } => f.write_str("reported(success)"),
            RunPhase::Reported { valid: false } => f.write_str("reported(failure)"),
            RunPhase::Aborted(kind) => write!(f, "aborted({})", kind),
        }
    }
}

impl RunPhase {
    /// Move to `next`, logging the transition
    pub fn advance(self, next: RunPhase) -> RunPhase {
        tracing::debug!(from = %self, to = %next, "run phase");
        next
    }
}

/// What a completed run hands to the report formatter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub schema: PathBuf,
    pub document: PathBuf,
    pub outcome: ValidationOutcome,
    /// Last phase reached; always [`RunPhase::Validated`] for a returned report
    pub phase: RunPhase,
}

/// Sequences path resolution, schema and document loading and validation
pub struct ValidationPipeline<E: SchemaEngine, A: AmbientDirectory = ProcessDirectory> {
    engine: E,
    context: WorkingContext<A>,
    settings: SchemaConfig,
}

impl<E: SchemaEngine> ValidationPipeline<E, ProcessDirectory> {
    pub fn new(engine: E, settings: SchemaConfig) -> Self {
        Self::with_context(engine, WorkingContext::process(), settings)
    }
}

impl<E: SchemaEngine, A: AmbientDirectory> ValidationPipeline<E, A> {
    pub fn with_context(engine: E, context: WorkingContext<A>, settings: SchemaConfig) -> Self {
        Self {
            engine,
            context,
            settings,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Validate the document at `xml` against the schema at `xsd`.
    ///
    /// Both arguments are raw user input: `~` is expanded and the result
    /// made absolute before anything is read.
    pub fn run(&self, xml: &str, xsd: &str) -> Result<RunReport> {
        let mut phase = RunPhase::Start;
        match self.run_phases(xml, xsd, &mut phase) {
            Ok(report) => Ok(report),
            Err(err) => {
                phase.advance(RunPhase::Aborted(err.kind()));
                Err(err)
            }
        }
    }

    fn run_phases(&self, xml: &str, xsd: &str, phase: &mut RunPhase) -> Result<RunReport> {
        if xml.is_empty() || xsd.is_empty() {
            let mut missing = Vec::new();
            if xml.is_empty() {
                missing.push("-xml");
            }
            if xsd.is_empty() {
                missing.push("-xsd");
            }
            return Err(RunError::RequiredArgumentMissing { missing });
        }

        let document = paths::resolve(xml).map_err(|_| RunError::HomeResolution {
            role: PathRole::Document,
            path: xml.to_string(),
        })?;
        let schema = paths::resolve(xsd).map_err(|_| RunError::HomeResolution {
            role: PathRole::Schema,
            path: xsd.to_string(),
        })?;
        tracing::info!(schema = %schema.display(), document = %document.display(), "resolved paths");
        *phase = phase.advance(RunPhase::PathsResolved);

        let compiled = SchemaLoader::new(&self.engine, &self.context, &self.settings)
            .load_schema(&schema)?;
        *phase = phase.advance(RunPhase::SchemaLoaded);
        if self.settings.include_resolution == IncludeResolution::WorkingDirectory {
            *phase = phase.advance(RunPhase::ContextRestored);
        }

        let parsed = DocumentLoader::new(&self.engine).load_document(&document)?;
        *phase = phase.advance(RunPhase::DocumentLoaded);

        let outcome = Validator::new(&self.engine).validate(&compiled, &parsed)?;
        *phase = phase.advance(RunPhase::Validated);

        Ok(RunReport {
            schema,
            document,
            outcome,
            phase: *phase,
        })
    }
}
