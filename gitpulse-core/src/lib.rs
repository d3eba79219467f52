//! Gitpulse core library - mines git history into per-commit change
//! metrics, similarity-weighted churn, and session-based effort estimates

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Commit hash is the sole identity
// - Hunk, block, and line production is deterministic per pair
// - Segmentation, LOC, and similarity are pure functions
// - Identical input yields byte-for-byte identical output
// - Pair-local failures degrade or skip; they never abort the run

pub mod analysis;
pub mod blocks;
pub mod cancel;
pub mod clones;
pub mod config;
pub mod developers;
pub mod errors;
pub mod hours;
pub mod loc;
pub mod metrics;
pub mod pairs;
pub mod patch;
pub mod repo;
pub mod report;
pub mod similarity;
pub mod span;

pub use analysis::analyze_repository;
pub use cancel::CancellationToken;
pub use config::{load_resolved, ExecutionPolicy, GitPulseConfig, ResolvedConfig};
pub use errors::{exit_code_for, AnalysisError};
pub use report::{render_json, render_text, write_output, AnalysisReport};
pub use similarity::MeasurementType;
pub use span::{CommitSpan, SpanBound, TimeSelector};
