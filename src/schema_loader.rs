use std::fs;
use std::path::Path;

use crate::config::{CircularIncludePolicy, IncludeResolution, SchemaConfig};
use crate::engine::SchemaEngine;
use crate::error::{EngineError, Result, RunError};
use crate::include_graph::IncludeGraphScanner;
use crate::working_context::{AmbientDirectory, ProcessDirectory, WorkingContext};

/// Reads a schema file and compiles it, including everything it references
pub struct SchemaLoader<'a, E: SchemaEngine, A: AmbientDirectory = ProcessDirectory> {
    engine: &'a E,
    context: &'a WorkingContext<A>,
    settings: &'a SchemaConfig,
}

impl<'a, E: SchemaEngine, A: AmbientDirectory> SchemaLoader<'a, E, A> {
    pub fn new(engine: &'a E, context: &'a WorkingContext<A>, settings: &'a SchemaConfig) -> Self {
        Self {
            engine,
            context,
            settings,
        }
    }

    /// Load and compile the schema at `path` (absolute, already resolved).
    ///
    /// In [`IncludeResolution::WorkingDirectory`] mode the working directory
    /// is the schema's own directory during compilation and is back to its
    /// previous value when this returns, whatever the result.
    pub fn load_schema(&self, path: &Path) -> Result<E::Schema> {
        let bytes = fs::read(path).map_err(|source| RunError::SchemaRead {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "read schema");

        if self.settings.circular_includes == CircularIncludePolicy::Reject {
            let content = String::from_utf8_lossy(&bytes);
            IncludeGraphScanner::new(self.settings.max_include_depth)
                .scan(path, &content)
                .map_err(|err| RunError::SchemaParse {
                    path: path.to_path_buf(),
                    details: err.to_string(),
                })?;
        }

        match self.settings.include_resolution {
            IncludeResolution::WorkingDirectory => self
                .context
                .with_schema_directory_context(path, || self.compile(&bytes, None, path)),
            IncludeResolution::BaseUri => self.compile(&bytes, Some(path), path),
        }
    }

    fn compile(&self, bytes: &[u8], base: Option<&Path>, path: &Path) -> Result<E::Schema> {
        self.engine
            .compile_schema(bytes, base)
            .map_err(|err| schema_parse_error(path, err))
            .inspect(|_| tracing::info!(path = %path.display(), "compiled schema"))
    }
}

fn schema_parse_error(path: &Path, err: EngineError) -> RunError {
    let details = match err {
        EngineError::SchemaParseFailed { diagnostics } if !diagnostics.is_empty() => {
            diagnostics.join("; ")
        }
        other => other.to_string(),
    };
    RunError::SchemaParse {
        path: path.to_path_buf(),
        details,
    }
}
