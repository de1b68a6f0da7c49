use std::fs;
use std::path::Path;

use crate::engine::SchemaEngine;
use crate::error::{EngineError, Result, RunError};

/// Reads and parses the document to validate
pub struct DocumentLoader<'a, E: SchemaEngine> {
    engine: &'a E,
}

impl<'a, E: SchemaEngine> DocumentLoader<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Parse the document at `path`. The working directory is not involved.
    pub fn load_document(&self, path: &Path) -> Result<E::Document> {
        let bytes = fs::read(path).map_err(|source| RunError::DocumentRead {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "read document");

        self.engine
            .parse_document(&bytes, Some(path))
            .map_err(|err| {
                let details = match err {
                    EngineError::DocumentParseFailed { diagnostics } if !diagnostics.is_empty() => {
                        diagnostics.join("; ")
                    }
                    other => other.to_string(),
                };
                RunError::DocumentParse {
                    path: path.to_path_buf(),
                    details,
                }
            })
    }
}
