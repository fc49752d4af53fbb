//! TargCC Patcher: one-shot repair of TargCC V2 generator output.
//!
//! The generator ships a handful of known template defects that keep its
//! generated projects from compiling. This crate fixes them in place: each
//! affected source file is a [`FileTarget`] carrying an ordered list of
//! [`Rule`]s, and the [`Runner`] reads the file once, applies the rules to an
//! in-memory copy, and writes the result back.
//!
//! # Semantics
//!
//! - Rules apply in declared order; each rule sees the output of the rules
//!   before it, never the original content.
//! - A rule that finds nothing to replace is a silent no-op, not an error.
//! - Insert-once flags and region gates live inside a single file's
//!   application and reset for every target.
//! - The run is fail-fast: the first I/O or pattern error stops everything,
//!   and the remaining targets are reported as skipped.

pub mod patches;
pub mod rules;
pub mod runner;

// Re-exports
pub use patches::{generator_fixes, PatchParams};
pub use rules::{apply_rules, Gate, Rule, RuleError};
pub use runner::{
    resolve_workspace, EngineError, FileTarget, Mode, RunResult, Runner, TargetReport,
    TargetStatus,
};
