//! Engine error types
//!
//! Only configuration mistakes and a lost working directory are errors here.
//! Extraction misses, process failures, build failures and non-convergence are
//! recoverable outcomes and are reported as values by the components that
//! encounter them.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while setting up or driving a sweep
#[derive(Error, Debug)]
pub enum EngineError {
    /// Extraction pattern failed to compile
    #[error("Invalid pattern for signal '{signal}': {source}")]
    InvalidPattern {
        signal: String,
        #[source]
        source: regex::Error,
    },

    /// Extraction pattern compiled but does not fit its unit policy
    #[error("Pattern for signal '{signal}' is unusable: {message}")]
    PatternShape { signal: String, message: String },

    /// Unit token in configuration is not a known policy
    #[error("Unknown unit policy '{token}' (expected s, ms, us, ns, auto or raw)")]
    UnknownUnit { token: String },

    /// Benchmark definition violates the matrix contract
    #[error("Invalid benchmark '{name}': {message}")]
    InvalidBenchmark { name: String, message: String },

    /// Configuration point definition is malformed
    #[error("Invalid configuration point '{label}': {message}")]
    InvalidConfiguration { label: String, message: String },

    /// Sampler parameters are out of range
    #[error("Invalid sampler settings: {message}")]
    InvalidSampler { message: String },

    /// Matrix file could not be read
    #[error("Failed to read matrix file {path}: {source}")]
    MatrixRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Matrix file is not valid TOML for the matrix schema
    #[error("Failed to parse matrix file: {0}")]
    MatrixParse(#[from] toml::de::Error),

    /// The prior working directory could not be restored after an invocation.
    ///
    /// Fatal: every later measurement would run in an unknown directory.
    #[error("Failed to restore working directory {path}: {source}")]
    DirectoryRestore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a pattern shape error
    pub fn pattern_shape(signal: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PatternShape {
            signal: signal.into(),
            message: message.into(),
        }
    }

    /// Create an invalid benchmark error
    pub fn invalid_benchmark(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidBenchmark {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration point error
    pub fn invalid_configuration(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            label: label.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DirectoryRestore { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::invalid_benchmark("bfs", "expected 3 commands, got 2");
        assert_eq!(
            err.to_string(),
            "Invalid benchmark 'bfs': expected 3 commands, got 2"
        );

        let err = EngineError::UnknownUnit {
            token: "fortnights".to_string(),
        };
        assert!(err.to_string().contains("fortnights"));
    }

    #[test]
    fn test_only_directory_restore_is_fatal() {
        let restore = EngineError::DirectoryRestore {
            path: PathBuf::from("/tmp/eval"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(restore.is_fatal());
        assert!(!EngineError::pattern_shape("x", "y").is_fatal());
        assert!(!EngineError::Io(std::io::Error::other("boom")).is_fatal());
    }
}
