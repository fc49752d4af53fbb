//! Repository generator fixes: thread a `rootNamespace` parameter through the
//! `GenerateAsync` signatures and turn the hardcoded `TargCC.*` namespace
//! strings into interpolations over it.

use crate::patches::PatchParams;
use crate::rules::Rule;
use crate::runner::FileTarget;

pub fn targets(params: &PatchParams) -> Vec<FileTarget> {
    vec![interface_target(params), implementation_target(params)]
}

fn interface_target(params: &PatchParams) -> FileTarget {
    FileTarget::new(
        "src/TargCC.Core.Generators/Repositories/IRepositoryGenerator.cs",
        vec![Rule::literal(
            "Task<string> GenerateAsync(Table table);",
            format!(
                r#"Task<string> GenerateAsync(Table table, string rootNamespace = "{}");"#,
                params.root_namespace
            ),
        )],
    )
}

fn implementation_target(params: &PatchParams) -> FileTarget {
    FileTarget::new(
        "src/TargCC.Core.Generators/Repositories/RepositoryGenerator.cs",
        vec![
            Rule::pattern(
                r"public async Task<string> GenerateAsync\(Table table\)",
                format!(
                    r#"public async Task<string> GenerateAsync(Table table, string rootNamespace = "{}")"#,
                    params.root_namespace
                ),
            ),
            // The `{rootNamespace}` below is C# string interpolation emitted
            // into the generator source, not a parameter of this patcher.
            Rule::literal(
                r#""namespace TargCC.Infrastructure.Repositories""#,
                r#"$"namespace {rootNamespace}.Infrastructure.Repositories""#,
            ),
            Rule::literal(
                r#""using TargCC.Domain.Entities""#,
                r#"$"using {rootNamespace}.Domain.Entities""#,
            ),
            Rule::literal(
                r#""using TargCC.Domain.Interfaces""#,
                r#"$"using {rootNamespace}.Domain.Interfaces""#,
            ),
        ],
    )
}
