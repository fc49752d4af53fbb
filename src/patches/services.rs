//! Generation service fix: the repository generators now take a root
//! namespace, so their call sites must pass the service's `rootNamespace`
//! local through.

use crate::rules::Rule;
use crate::runner::FileTarget;

pub fn target() -> FileTarget {
    FileTarget::new(
        "src/TargCC.CLI/Services/Generation/ProjectGenerationService.cs",
        vec![
            Rule::literal(
                "await repoInterfaceGen.GenerateAsync(table);",
                "await repoInterfaceGen.GenerateAsync(table, rootNamespace);",
            ),
            Rule::literal(
                "await repoGen.GenerateAsync(table);",
                "await repoGen.GenerateAsync(table, rootNamespace);",
            ),
        ],
    )
}
