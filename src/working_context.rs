//! Scoped working directory changes for schema compilation.
//!
//! libxml2 resolves relative `xs:include`/`xs:import` locations of an
//! in-memory schema against the process working directory, not against the
//! schema file. [`WorkingContext::with_schema_directory_context`] bridges
//! that gap: it switches to the schema's directory for the duration of one
//! action and always switches back.
//!
//! The working directory is process-wide state. Nothing here takes a lock:
//! callers that run validations concurrently, or do other cwd-relative work
//! while a schema loads, must serialize the schema loading phase themselves.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::{DirectoryOp, Result, RunError};
use crate::paths::containing_directory;

/// Access to the ambient directory relative paths are resolved against
#[cfg_attr(test, mockall::automock)]
pub trait AmbientDirectory {
    fn current(&self) -> io::Result<PathBuf>;
    fn change_to(&self, dir: &Path) -> io::Result<()>;
}

/// The real process working directory
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessDirectory;

impl AmbientDirectory for ProcessDirectory {
    fn current(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn change_to(&self, dir: &Path) -> io::Result<()> {
        std::env::set_current_dir(dir)
    }
}

/// Explicit handle on the working directory of a validation run
#[derive(Debug, Default)]
pub struct WorkingContext<A: AmbientDirectory = ProcessDirectory> {
    ambient: A,
}

impl WorkingContext<ProcessDirectory> {
    pub fn process() -> Self {
        Self {
            ambient: ProcessDirectory,
        }
    }
}

impl<A: AmbientDirectory> WorkingContext<A> {
    pub fn new(ambient: A) -> Self {
        Self { ambient }
    }

    /// Run `action` with the working directory set to the directory
    /// containing `schema_path`.
    ///
    /// The original directory is restored on every exit path. A failed
    /// restoration wins over the action's own error: the process is then in
    /// an unknown state and the run must stop.
    pub fn with_schema_directory_context<T, F>(&self, schema_path: &Path, action: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let dir = containing_directory(schema_path);

        let original = self
            .ambient
            .current()
            .map_err(|source| RunError::WorkingDirectory {
                op: DirectoryOp::Capture,
                path: None,
                source,
            })?;

        self.ambient
            .change_to(&dir)
            .map_err(|source| RunError::WorkingDirectory {
                op: DirectoryOp::Change,
                path: Some(dir.clone()),
                source,
            })?;
        tracing::debug!(from = %original.display(), to = %dir.display(), "entered schema directory");

        let guard = RestoreGuard {
            ambient: &self.ambient,
            original: Some(original),
        };
        let result = action();

        match guard.restore() {
            Ok(()) => result,
            Err(restore_err) => {
                if let Err(action_err) = &result {
                    tracing::error!(error = %action_err, "schema loading failed before directory restoration failed");
                }
                Err(restore_err)
            }
        }
    }
}

/// Restores the captured directory if the action unwinds
struct RestoreGuard<'a, A: AmbientDirectory> {
    ambient: &'a A,
    original: Option<PathBuf>,
}

impl<A: AmbientDirectory> RestoreGuard<'_, A> {
    fn restore(mut self) -> Result<()> {
        let Some(original) = self.original.take() else {
            return Ok(());
        };
        self.ambient
            .change_to(&original)
            .map_err(|source| RunError::WorkingDirectory {
                op: DirectoryOp::Restore,
                path: Some(original.clone()),
                source,
            })?;
        tracing::debug!(to = %original.display(), "restored working directory");
        Ok(())
    }
}

impl<A: AmbientDirectory> Drop for RestoreGuard<'_, A> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take()
            && let Err(err) = self.ambient.change_to(&original)
        {
            tracing::error!(path = %original.display(), error = %err, "failed to restore working directory while unwinding");
        }
    }
}

/// Serializes tests that change the process working directory
#[cfg(test)]
pub(crate) static TEST_CWD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
