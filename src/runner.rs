//! Target sequencing and run aggregation.
//!
//! The runner owns the read → transform → write lifecycle of each file
//! target. A file is read whole, its rule list is applied to the in-memory
//! copy, and the result is written back in place only when every rule
//! completed. Targets run strictly in declared order; the first failure
//! stops the run and marks the remaining targets skipped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::rules::{apply_rules, Rule, RuleError};

/// One file on disk plus the ordered rules that repair it.
#[derive(Debug, Clone)]
pub struct FileTarget {
    /// Path relative to the workspace root. Identity of the target.
    pub path: String,
    pub rules: Vec<Rule>,
}

impl FileTarget {
    pub fn new(path: impl Into<String>, rules: Vec<Rule>) -> Self {
        FileTarget {
            path: path.into(),
            rules,
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Whether a run mutates the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Write patched content back in place.
    Apply,
    /// Evaluate everything, write nothing; reports carry the would-be content.
    Check,
}

/// Outcome of one file target.
#[derive(Debug)]
pub enum TargetStatus {
    /// At least one rule changed the content.
    Patched {
        /// Match count per rule, in rule order.
        matches: Vec<usize>,
        /// Transformed content, kept only in [`Mode::Check`] runs.
        preview: Option<String>,
    },
    /// Every rule no-opped; the file was not rewritten.
    Unchanged,
    Failed(EngineError),
    /// Never attempted because an earlier target failed.
    Skipped,
}

#[derive(Debug)]
pub struct TargetReport {
    /// Resolved path the target was (or would have been) read from.
    pub file: PathBuf,
    pub status: TargetStatus,
}

impl fmt::Display for TargetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            TargetStatus::Patched { matches, .. } => {
                let applied = matches.iter().filter(|&&n| n > 0).count();
                write!(
                    f,
                    "Patched {} ({applied}/{} rules matched)",
                    self.file.display(),
                    matches.len()
                )
            }
            TargetStatus::Unchanged => write!(f, "Unchanged {}", self.file.display()),
            TargetStatus::Failed(e) => write!(f, "Failed {}: {e}", self.file.display()),
            TargetStatus::Skipped => write!(f, "Skipped {}", self.file.display()),
        }
    }
}

/// Ordered per-target outcomes for one invocation.
#[derive(Debug, Default)]
pub struct RunResult {
    pub reports: Vec<TargetReport>,
}

impl RunResult {
    /// True when no target failed (unchanged and skipped targets count as
    /// success only if nothing failed; a run with skips always has a failure).
    pub fn success(&self) -> bool {
        !self
            .reports
            .iter()
            .any(|r| matches!(r.status, TargetStatus::Failed(_)))
    }

    pub fn first_failure(&self) -> Option<&TargetReport> {
        self.reports
            .iter()
            .find(|r| matches!(r.status, TargetStatus::Failed(_)))
    }
}

/// Sequences file targets against a workspace root.
#[derive(Debug, Clone)]
pub struct Runner {
    root: PathBuf,
    mode: Mode,
}

impl Runner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Runner {
            root: root.into(),
            mode: Mode::Apply,
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Run every target in order, reporting each outcome to `observer` as it
    /// occurs. Fail-fast: after the first failure the remaining targets are
    /// reported [`TargetStatus::Skipped`] without touching their files.
    pub fn run<F>(&self, targets: &[FileTarget], mut observer: F) -> RunResult
    where
        F: FnMut(&TargetReport),
    {
        let mut reports = Vec::with_capacity(targets.len());
        let mut halted = false;

        for target in targets {
            let report = if halted {
                TargetReport {
                    file: self.root.join(&target.path),
                    status: TargetStatus::Skipped,
                }
            } else {
                self.run_target(target)
            };

            if matches!(report.status, TargetStatus::Failed(_)) {
                halted = true;
            }

            observer(&report);
            reports.push(report);
        }

        RunResult { reports }
    }

    fn run_target(&self, target: &FileTarget) -> TargetReport {
        let path = self.root.join(&target.path);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(source) => {
                return TargetReport {
                    file: path.clone(),
                    status: TargetStatus::Failed(EngineError::Read { path, source }),
                };
            }
        };

        let (patched, matches) = match apply_rules(&content, &target.rules) {
            Ok(applied) => applied,
            Err(e) => {
                return TargetReport {
                    file: path,
                    status: TargetStatus::Failed(EngineError::Rule(e)),
                };
            }
        };

        if patched == content {
            return TargetReport {
                file: path,
                status: TargetStatus::Unchanged,
            };
        }

        match self.mode {
            Mode::Apply => {
                // In-place overwrite, no backup. An interruption mid-write can
                // truncate the file; a failure before this point leaves it
                // untouched.
                if let Err(source) = fs::write(&path, &patched) {
                    return TargetReport {
                        file: path.clone(),
                        status: TargetStatus::Failed(EngineError::Write { path, source }),
                    };
                }
                TargetReport {
                    file: path,
                    status: TargetStatus::Patched {
                        matches,
                        preview: None,
                    },
                }
            }
            Mode::Check => TargetReport {
                file: path,
                status: TargetStatus::Patched {
                    matches,
                    preview: Some(patched),
                },
            },
        }
    }
}

/// Resolve the workspace root: explicit flag, environment variable, then an
/// ancestor walk from the current directory looking for the generator tree.
pub fn resolve_workspace(
    explicit: Option<PathBuf>,
    env_var: &str,
    probe: &str,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }

    if let Ok(env_path) = std::env::var(env_var) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .find(|ancestor| ancestor.join(probe).is_dir())
        .map(Path::to_path_buf)
}
