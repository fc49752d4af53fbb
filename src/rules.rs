use std::fmt;

use regex::Regex;
use thiserror::Error;

/// The fundamental patch primitive: one ordered text transformation.
///
/// A file's patch set is a `Vec<Rule>` applied front to back; each rule sees
/// the output of every rule before it, never the original content. All four
/// variants share the same contract: a rule that finds nothing to do returns
/// the content byte-identical and a match count of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a Rule does nothing until applied to content"]
pub enum Rule {
    /// Replace every exact occurrence of `find` with `replace`.
    Literal { find: String, replace: String },

    /// Global non-overlapping regex substitution, left-to-right.
    ///
    /// `replace` may reference capture groups as `$1` / `${1}`.
    Pattern { find: String, replace: String },

    /// Append `lines` immediately after the first line containing `trigger`.
    ///
    /// The insertion happens at most once per application, no matter how many
    /// times the trigger line recurs. `unless` suppresses the insert entirely
    /// when the marker is already present in the content, and `gate`
    /// restricts trigger detection to lines inside the gated region.
    InsertAfter {
        trigger: String,
        lines: Vec<String>,
        unless: Option<String>,
        gate: Option<Gate>,
    },

    /// Rewrite `find` to `replace`, but only on lines that contain `when`
    /// and sit inside the region opened by `gate`.
    GatedRewrite {
        gate: Gate,
        when: String,
        find: String,
        replace: String,
    },
}

/// A scanning flag over a file's lines.
///
/// The gate starts closed and opens permanently once any of its markers is
/// seen while scanning top-to-bottom. Context is derived strictly from
/// earlier lines (a marker opens the gate for its own line onward); gate
/// state never outlives a single rule application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    markers: Vec<String>,
}

impl Gate {
    /// Gate that opens on the first line containing any of `markers`.
    pub fn any_of<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Gate {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    /// One flag per line: is the gate open at this line?
    fn open_flags(&self, lines: &[&str]) -> Vec<bool> {
        let mut open = false;
        lines
            .iter()
            .map(|line| {
                if !open && self.markers.iter().any(|m| line.contains(m.as_str())) {
                    open = true;
                }
                open
            })
            .collect()
    }
}

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("invalid pattern `{pattern}`: {source}")]
    BadPattern {
        pattern: String,
        source: regex::Error,
    },
}

impl Rule {
    pub fn literal(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Rule::Literal {
            find: find.into(),
            replace: replace.into(),
        }
    }

    pub fn pattern(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Rule::Pattern {
            find: find.into(),
            replace: replace.into(),
        }
    }

    /// Apply this rule to `content`, returning the transformed content and
    /// the number of places the rule matched.
    ///
    /// A count of zero guarantees the returned content is byte-identical to
    /// the input; callers rely on that for unchanged-file detection.
    pub fn apply(&self, content: &str) -> Result<(String, usize), RuleError> {
        match self {
            Rule::Literal { find, replace } => {
                let count = content.matches(find.as_str()).count();
                if count == 0 {
                    return Ok((content.to_string(), 0));
                }
                Ok((content.replace(find.as_str(), replace), count))
            }
            Rule::Pattern { find, replace } => {
                let re = Regex::new(find).map_err(|source| RuleError::BadPattern {
                    pattern: find.clone(),
                    source,
                })?;
                let count = re.find_iter(content).count();
                if count == 0 {
                    return Ok((content.to_string(), 0));
                }
                Ok((re.replace_all(content, replace.as_str()).into_owned(), count))
            }
            Rule::InsertAfter {
                trigger,
                lines,
                unless,
                gate,
            } => Ok(apply_insert(content, trigger, lines, unless.as_deref(), gate)),
            Rule::GatedRewrite {
                gate,
                when,
                find,
                replace,
            } => Ok(apply_gated_rewrite(content, gate, when, find, replace)),
        }
    }
}

/// Short one-line description for progress/list output.
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Literal { find, .. } => write!(f, "replace {}", excerpt(find)),
            Rule::Pattern { find, .. } => write!(f, "rewrite /{}/", excerpt(find)),
            Rule::InsertAfter { trigger, lines, .. } => {
                write!(f, "insert {} line(s) after {}", lines.len(), excerpt(trigger))
            }
            Rule::GatedRewrite { find, .. } => write!(f, "gated rewrite {}", excerpt(find)),
        }
    }
}

fn excerpt(s: &str) -> String {
    const MAX: usize = 40;
    if s.chars().count() <= MAX {
        format!("`{s}`")
    } else {
        let head: String = s.chars().take(MAX).collect();
        format!("`{head}…`")
    }
}

/// Apply an ordered rule list, threading each rule's output into the next.
///
/// Returns the final content plus one match count per rule, in rule order.
pub fn apply_rules(content: &str, rules: &[Rule]) -> Result<(String, Vec<usize>), RuleError> {
    let mut current = content.to_string();
    let mut matches = Vec::with_capacity(rules.len());
    for rule in rules {
        let (next, count) = rule.apply(&current)?;
        current = next;
        matches.push(count);
    }
    Ok((current, matches))
}

fn apply_insert(
    content: &str,
    trigger: &str,
    insert_lines: &[String],
    unless: Option<&str>,
    gate: &Option<Gate>,
) -> (String, usize) {
    if let Some(marker) = unless {
        if content.contains(marker) {
            return (content.to_string(), 0);
        }
    }

    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let open = match gate {
        Some(gate) => gate.open_flags(&lines),
        None => vec![true; lines.len()],
    };

    let mut out = String::with_capacity(content.len());
    let mut inserted = false;

    for (i, line) in lines.iter().enumerate() {
        out.push_str(line);
        if !inserted && open[i] && line.contains(trigger) {
            if !line.ends_with('\n') {
                out.push('\n');
            }
            for extra in insert_lines {
                out.push_str(extra);
                out.push('\n');
            }
            inserted = true;
        }
    }

    (out, usize::from(inserted))
}

fn apply_gated_rewrite(
    content: &str,
    gate: &Gate,
    when: &str,
    find: &str,
    replace: &str,
) -> (String, usize) {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let open = gate.open_flags(&lines);

    let mut out = String::with_capacity(content.len());
    let mut count = 0;

    for (i, line) in lines.iter().enumerate() {
        if open[i] && line.contains(when) {
            let hits = line.matches(find).count();
            if hits > 0 {
                out.push_str(&line.replace(find, replace));
                count += hits;
                continue;
            }
        }
        out.push_str(line);
    }

    (out, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ENTITIES: [&str; 4] = ["Customer", "Order", "Product", "OrderItem"];

    #[test]
    fn literal_replaces_all_occurrences() {
        let rule = Rule::literal("foo", "bar");
        let (out, count) = rule.apply("foo a foo b foo").unwrap();
        assert_eq!(out, "bar a bar b bar");
        assert_eq!(count, 3);
    }

    #[test]
    fn literal_no_match_is_identity() {
        let rule = Rule::literal("missing", "anything");
        let input = "line one\nline two\n";
        let (out, count) = rule.apply(input).unwrap();
        assert_eq!(out, input);
        assert_eq!(count, 0);
    }

    #[test]
    fn pattern_capture_groups_rewrite_repository_interfaces() {
        let rule = Rule::pattern(r"IRepository<(\w+)>", "I${1}Repository");
        for entity in ENTITIES {
            let input = format!("private readonly IRepository<{entity}> _repo;");
            let (out, count) = rule.apply(&input).unwrap();
            assert_eq!(out, format!("private readonly I{entity}Repository _repo;"));
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn pattern_no_match_is_silent_noop() {
        let rule = Rule::pattern(r"IMapper mapper,?\s*", "");
        let input = "public Controller(ILogger logger)\n";
        let (out, count) = rule.apply(input).unwrap();
        assert_eq!(out, input);
        assert_eq!(count, 0);
    }

    #[test]
    fn pattern_rejects_invalid_regex() {
        let rule = Rule::pattern(r"IRepository<(\w+>", "broken");
        let err = rule.apply("anything").unwrap_err();
        assert!(matches!(err, RuleError::BadPattern { .. }));
    }

    #[test]
    fn generate_async_signature_rewrite() {
        let rule = Rule::pattern(
            r"public async Task<string> GenerateAsync\(Table table\)",
            r#"public async Task<string> GenerateAsync(Table table, string rootNamespace = "YourApp")"#,
        );
        let input = "    public async Task<string> GenerateAsync(Table table)\n    {\n";
        let (out, _) = rule.apply(input).unwrap();
        assert_eq!(
            out,
            "    public async Task<string> GenerateAsync(Table table, string rootNamespace = \"YourApp\")\n    {\n"
        );
    }

    #[test]
    fn insert_happens_exactly_once_for_recurring_trigger() {
        let rule = Rule::InsertAfter {
            trigger: "using Logging;".to_string(),
            lines: vec!["using Domain.Interfaces;".to_string()],
            unless: None,
            gate: None,
        };
        let input = "using Logging;\nclass A {}\nusing Logging;\nclass B {}\n";
        let (out, count) = rule.apply(input).unwrap();
        assert_eq!(
            out,
            "using Logging;\nusing Domain.Interfaces;\nclass A {}\nusing Logging;\nclass B {}\n"
        );
        assert_eq!(count, 1);
    }

    #[test]
    fn insert_preserves_untouched_line_order() {
        let rule = Rule::InsertAfter {
            trigger: "two".to_string(),
            lines: vec!["extra".to_string()],
            unless: None,
            gate: None,
        };
        let (out, _) = rule.apply("one\ntwo\nthree\n").unwrap();
        assert_eq!(out, "one\ntwo\nextra\nthree\n");
    }

    #[test]
    fn insert_after_final_line_without_newline() {
        let rule = Rule::InsertAfter {
            trigger: "last".to_string(),
            lines: vec!["appended".to_string()],
            unless: None,
            gate: None,
        };
        let (out, count) = rule.apply("first\nlast").unwrap();
        assert_eq!(out, "first\nlast\nappended\n");
        assert_eq!(count, 1);
    }

    #[test]
    fn insert_suppressed_by_unless_marker() {
        let rule = Rule::InsertAfter {
            trigger: "using Logging;".to_string(),
            lines: vec!["using App.Domain.Interfaces;".to_string()],
            unless: Some(".Domain.Interfaces".to_string()),
            gate: None,
        };
        let input = "using Logging;\nusing App.Domain.Interfaces;\n";
        let (out, count) = rule.apply(input).unwrap();
        assert_eq!(out, input);
        assert_eq!(count, 0);
    }

    #[test]
    fn gated_insert_ignores_trigger_before_gate_opens() {
        let rule = Rule::InsertAfter {
            trigger: "Swashbuckle".to_string(),
            lines: vec!["<PackageReference Include=\"AutoMapper\" />".to_string()],
            unless: None,
            gate: Some(Gate::any_of(["ProjectType.Api"])),
        };
        let input = "Swashbuckle\nProjectType.Api\nSwashbuckle\n";
        let (out, count) = rule.apply(input).unwrap();
        assert_eq!(
            out,
            "Swashbuckle\nProjectType.Api\nSwashbuckle\n<PackageReference Include=\"AutoMapper\" />\n"
        );
        assert_eq!(count, 1);
    }

    #[test]
    fn gated_rewrite_only_touches_region() {
        let rule = Rule::GatedRewrite {
            gate: Gate::any_of(["Type.Api"]),
            when: "<Project Sdk=\"Microsoft.NET.Sdk\">".to_string(),
            find: "Microsoft.NET.Sdk".to_string(),
            replace: "Microsoft.NET.Sdk.Web".to_string(),
        };
        let input = "<Project Sdk=\"Microsoft.NET.Sdk\">\nif (projectInfo.Type == ProjectType.Api)\n<Project Sdk=\"Microsoft.NET.Sdk\">\n";
        let (out, count) = rule.apply(input).unwrap();
        assert_eq!(
            out,
            "<Project Sdk=\"Microsoft.NET.Sdk\">\nif (projectInfo.Type == ProjectType.Api)\n<Project Sdk=\"Microsoft.NET.Sdk.Web\">\n"
        );
        assert_eq!(count, 1);
    }

    #[test]
    fn gated_rewrite_without_marker_is_identity() {
        let rule = Rule::GatedRewrite {
            gate: Gate::any_of(["Type.Api"]),
            when: "<Project Sdk=\"Microsoft.NET.Sdk\">".to_string(),
            find: "Microsoft.NET.Sdk".to_string(),
            replace: "Microsoft.NET.Sdk.Web".to_string(),
        };
        let input = "<Project Sdk=\"Microsoft.NET.Sdk\">\nplain library project\n";
        let (out, count) = rule.apply(input).unwrap();
        assert_eq!(out, input);
        assert_eq!(count, 0);
    }

    #[test]
    fn gated_rewrite_is_idempotent() {
        let rule = Rule::GatedRewrite {
            gate: Gate::any_of(["Type.Api"]),
            when: "<Project Sdk=\"Microsoft.NET.Sdk\">".to_string(),
            find: "Microsoft.NET.Sdk".to_string(),
            replace: "Microsoft.NET.Sdk.Web".to_string(),
        };
        let input = "Type.Api\n<Project Sdk=\"Microsoft.NET.Sdk\">\n";
        let (once, _) = rule.apply(input).unwrap();
        let (twice, count) = rule.apply(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(count, 0);
    }

    #[test]
    fn later_rules_see_earlier_output() {
        let rules = vec![
            Rule::literal("alpha", "beta"),
            Rule::literal("beta", "gamma"),
        ];
        let (out, matches) = apply_rules("alpha\n", &rules).unwrap();
        assert_eq!(out, "gamma\n");
        assert_eq!(matches, vec![1, 1]);
    }

    #[test]
    fn narrowing_rules_converge_in_either_order() {
        // The generic interface rewrite and the Dto-narrowing literal have
        // disjoint match domains, so declared order and the reordering reach
        // the same end state for every entity.
        for entity in ENTITIES {
            let input = format!(
                "IRepository<{entity}> repo;\n{entity}Dto dto = Get{entity}Dto();\n"
            );
            let pattern = Rule::pattern(r"IRepository<(\w+)>", "I${1}Repository");
            let narrow = Rule::literal(format!("{entity}Dto"), entity);

            let (declared, _) =
                apply_rules(&input, &[pattern.clone(), narrow.clone()]).unwrap();
            let (reordered, _) = apply_rules(&input, &[narrow, pattern]).unwrap();

            assert_eq!(declared, reordered);
            assert_eq!(
                declared,
                format!("I{entity}Repository repo;\n{entity} dto = Get{entity}();\n")
            );
        }
    }

    proptest! {
        #[test]
        fn needle_free_content_is_untouched(content in "[a-z \n]{0,200}") {
            let rules = vec![
                Rule::literal("NEEDLE", "THREAD"),
                Rule::pattern(r"IRepository<(\w+)>", "I${1}Repository"),
            ];
            let (out, matches) = apply_rules(&content, &rules).unwrap();
            prop_assert_eq!(out, content);
            prop_assert_eq!(matches, vec![0, 0]);
        }

        #[test]
        fn literal_settles_after_one_application(body in "[a-c ]{0,100}") {
            // `aa` -> `b` cannot recreate its own search text, so a second
            // application has nothing left to do.
            let rule = Rule::literal("aa", "b");
            let (once, _) = rule.apply(&body).unwrap();
            let (twice, count) = rule.apply(&once).unwrap();
            prop_assert_eq!(count, 0);
            prop_assert_eq!(twice, once);
        }
    }
}
