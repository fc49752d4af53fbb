//! API controller generator fixes: drop the DTO layer and AutoMapper from the
//! emitted controllers so they work against the domain entities directly.

use crate::rules::Rule;
use crate::runner::FileTarget;

/// Entities the generator emits controllers for.
const ENTITIES: [&str; 4] = ["Customer", "Order", "Product", "OrderItem"];

pub fn target() -> FileTarget {
    let mut rules = vec![
        // The generator forgets the Domain.Interfaces using; leave a breadcrumb
        // right after the Logging using. The inserted line carries the
        // `.Domain.Interfaces` marker, so re-runs skip the insert.
        Rule::InsertAfter {
            trigger: "using Microsoft.Extensions.Logging;".to_string(),
            lines: vec![
                "            // Note: the .Domain.Interfaces using is emitted from config.Namespace"
                    .to_string(),
            ],
            unless: Some(".Domain.Interfaces".to_string()),
            gate: None,
        },
        // IRepository<Entity> -> IEntityRepository
        Rule::pattern(r"IRepository<(\w+)>", "I${1}Repository"),
    ];

    // Collapse the DTO types onto the entities.
    for entity in ENTITIES {
        rules.push(Rule::literal(format!("{entity}Dto"), entity));
    }
    for entity in ENTITIES {
        rules.push(Rule::literal(format!("Create{entity}Request"), entity));
        rules.push(Rule::literal(format!("Update{entity}Request"), entity));
    }

    // Strip AutoMapper: calls, using, field, constructor wiring.
    rules.push(Rule::pattern(r"_mapper\.Map<(\w+)>\(([^)]+)\)", "${2}"));
    rules.push(Rule::pattern(
        r"(?m)^(\s*)using AutoMapper;",
        "${1}// using AutoMapper; // Removed - using entities directly",
    ));
    rules.push(Rule::pattern(r"private readonly IMapper _mapper;\s*", ""));
    rules.push(Rule::pattern(r"IMapper mapper,?\s*", ""));
    rules.push(Rule::pattern(r"(?s)_mapper = mapper.*?;\s*", ""));

    FileTarget::new(
        "src/TargCC.Core.Generators/API/ApiControllerGenerator.cs",
        rules,
    )
}
