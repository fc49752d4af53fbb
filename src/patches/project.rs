//! Project file generator fixes, scoped to the API project template: the web
//! SDK swap and the package references the generator leaves out.
//!
//! Both rules hang off the same scanning gate: the generator declares the
//! project type before it emits the csproj template, so "are we inside the
//! API template" can only be decided from lines already seen.

use crate::rules::{Gate, Rule};
use crate::runner::FileTarget;

const API_MARKERS: [&str; 2] = ["projectInfo.Type == ProjectType.Api", "Type.Api"];

const AUTOMAPPER_VERSION: &str = "12.0.1";
const EFCORE_SQLSERVER_VERSION: &str = "8.0.0";

pub fn target() -> FileTarget {
    let gate = Gate::any_of(API_MARKERS);

    FileTarget::new(
        "src/TargCC.Core.Generators/Project/ProjectFileGenerator.cs",
        vec![
            // API projects need the web SDK. The `when` guard keeps the
            // rewrite off the already-patched `Microsoft.NET.Sdk.Web` line.
            Rule::GatedRewrite {
                gate: gate.clone(),
                when: r#"<Project Sdk="Microsoft.NET.Sdk">"#.to_string(),
                find: "Microsoft.NET.Sdk".to_string(),
                replace: "Microsoft.NET.Sdk.Web".to_string(),
            },
            // The emitted template stops at Swashbuckle; append the packages
            // the generated project actually compiles against.
            Rule::InsertAfter {
                trigger: "Swashbuckle.AspNetCore".to_string(),
                lines: vec![
                    format!(
                        r#"    <PackageReference Include="AutoMapper" Version="{AUTOMAPPER_VERSION}" />"#
                    ),
                    format!(
                        r#"    <PackageReference Include="AutoMapper.Extensions.Microsoft.DependencyInjection" Version="{AUTOMAPPER_VERSION}" />"#
                    ),
                    format!(
                        r#"    <PackageReference Include="Microsoft.EntityFrameworkCore.SqlServer" Version="{EFCORE_SQLSERVER_VERSION}" />"#
                    ),
                ],
                unless: Some(r#"<PackageReference Include="AutoMapper""#.to_string()),
                gate: Some(gate),
            },
        ],
    )
}
