//! Error kinds and process exit codes
//!
//! Analysis failures fall into a small closed set of kinds. Fatal kinds
//! surface as process exit codes; recoverable kinds are handled where they
//! occur (clone detection degrades to an empty set, a failed pair or file
//! is skipped and counted).

use thiserror::Error;

/// Process exit code for a successful run
pub const EXIT_OK: i32 = 0;
/// Process exit code for configuration errors
pub const EXIT_CONFIG: i32 = -1;
/// Process exit code for an unusable repository
pub const EXIT_REPO: i32 = -2;
/// Process exit code for invalid usage (bad bounds, ambiguous ids)
pub const EXIT_USAGE: i32 = -3;
/// Process exit code for external command failures
pub const EXIT_CMD: i32 = -4;
/// Process exit code for everything else
pub const EXIT_OTHER: i32 = i32::MIN + 1;

/// Closed set of analysis error kinds
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// Configuration file or resolved settings are invalid
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The backing git store is missing or unreadable
    #[error("repository unavailable: {0}")]
    RepositoryUnavailable(String),

    /// since/until bounds do not select a valid commit slice
    #[error("invalid span bounds: {0}")]
    BoundsInvalid(String),

    /// A commit-ish prefix for a single-commit request matched more than one commit
    #[error("ambiguous commit id: {0}")]
    AmbiguousSha(String),

    /// A unified-diff hunk header failed to parse
    #[error("malformed patch: {0}")]
    PatchMalformed(String),

    /// The external clone-detection process failed
    #[error("clone detection failed: {0}")]
    CloneDetectionFailed(String),

    /// Temp-directory setup or tree-entry write failed
    #[error("temp directory i/o failed: {0}")]
    TempIoFailed(String),

    /// The run was cancelled cooperatively
    #[error("analysis cancelled")]
    Cancelled,

    /// Invariant violation inside the analysis itself
    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Map this kind to its stable process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            AnalysisError::ConfigInvalid(_) => EXIT_CONFIG,
            AnalysisError::RepositoryUnavailable(_) => EXIT_REPO,
            AnalysisError::BoundsInvalid(_) | AnalysisError::AmbiguousSha(_) => EXIT_USAGE,
            AnalysisError::CloneDetectionFailed(_) | AnalysisError::TempIoFailed(_) => EXIT_CMD,
            AnalysisError::PatchMalformed(_)
            | AnalysisError::Cancelled
            | AnalysisError::Internal(_) => EXIT_OTHER,
        }
    }
}

/// Resolve the exit code for an arbitrary error chain.
///
/// Walks the chain for a typed [`AnalysisError`]; anything untyped maps to
/// [`EXIT_OTHER`].
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(kind) = cause.downcast_ref::<AnalysisError>() {
            return kind.exit_code();
        }
    }
    EXIT_OTHER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_stable() {
        assert_eq!(AnalysisError::ConfigInvalid("x".into()).exit_code(), -1);
        assert_eq!(
            AnalysisError::RepositoryUnavailable("x".into()).exit_code(),
            -2
        );
        assert_eq!(AnalysisError::BoundsInvalid("x".into()).exit_code(), -3);
        assert_eq!(AnalysisError::AmbiguousSha("x".into()).exit_code(), -3);
        assert_eq!(AnalysisError::TempIoFailed("x".into()).exit_code(), -4);
        assert_eq!(AnalysisError::Cancelled.exit_code(), i32::MIN + 1);
    }

    #[test]
    fn test_exit_code_walks_context_chain() {
        let err = anyhow::Error::new(AnalysisError::BoundsInvalid("until < since".into()))
            .context("resolving commit span");
        assert_eq!(exit_code_for(&err), EXIT_USAGE);

        let plain = anyhow::anyhow!("some io problem");
        assert_eq!(exit_code_for(&plain), EXIT_OTHER);
    }
}
