//! Built-in patch sets for the known TargCC V2 generator defects.
//!
//! Each submodule owns the rules for one generator area. Rules are fully
//! constructed here, at definition time, from [`PatchParams`]; the evaluator
//! itself never sees configuration.

pub mod api;
pub mod project;
pub mod repositories;
pub mod services;

use crate::runner::FileTarget;

/// Parameters threaded into rule construction.
#[derive(Debug, Clone)]
pub struct PatchParams {
    /// Default root namespace baked into the patched generator signatures.
    pub root_namespace: String,
}

impl Default for PatchParams {
    fn default() -> Self {
        PatchParams {
            root_namespace: "YourApp".to_string(),
        }
    }
}

/// The full ordered run: every generator fix, in the order the fixes must be
/// applied across files (repository signatures first, then their callers).
pub fn generator_fixes(params: &PatchParams) -> Vec<FileTarget> {
    let mut targets = repositories::targets(params);
    targets.push(api::target());
    targets.push(project::target());
    targets.push(services::target());
    targets
}
