//! Scoped working-directory change
//!
//! The process working directory is the one piece of shared mutable state in a
//! sweep. `DirGuard` changes into a benchmark directory and always changes
//! back: explicitly through [`DirGuard::restore`], which surfaces a failure,
//! or on drop when an invocation unwinds.

use crate::error::{EngineError, EngineResult};
use std::path::{Path, PathBuf};
use tracing::error;

/// Working directory held for the duration of one invocation
#[derive(Debug)]
pub struct DirGuard {
    previous: PathBuf,
    restored: bool,
}

impl DirGuard {
    /// Change into `dir`, remembering the current directory
    pub fn enter(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir.as_ref())?;
        Ok(Self {
            previous,
            restored: false,
        })
    }

    /// Directory that will be restored
    pub fn previous(&self) -> &Path {
        &self.previous
    }

    /// Change back to the remembered directory
    pub fn restore(mut self) -> EngineResult<()> {
        self.restored = true;
        std::env::set_current_dir(&self.previous).map_err(|source| {
            EngineError::DirectoryRestore {
                path: self.previous.clone(),
                source,
            }
        })
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            error!(
                path = %self.previous.display(),
                error = %e,
                "Failed to restore working directory"
            );
        }
    }
}
