//! Patch Runner: load a target, run a ruleset over it, write it back.
//!
//! The whole file is read once, transformed in memory and persisted once.
//! A rule that matches nothing is not an error unless [`RunOptions::strict`]
//! is set, so a successful run is no evidence that any edit took effect;
//! callers that care must inspect [`RunReport::rules`].

use crate::hint::{closest_line, Hint};
use crate::rule::{Pattern, RuleOutcome};
use crate::ruleset::{Ruleset, TextOutcome};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} rule(s) matched nothing in {path}: {}", .ids.len(), .ids.join(", "))]
    NoOpRules { path: PathBuf, ids: Vec<String> },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compute the result but leave the file untouched
    pub dry_run: bool,
    /// Refuse to write when any rule matched nothing
    pub strict: bool,
}

/// Outcome of [`run`].
#[derive(Debug, Clone, Serialize)]
#[must_use = "RunReport should be checked for no-op rules"]
pub struct RunReport {
    pub ruleset: String,
    pub target: PathBuf,
    pub rules: Vec<RuleOutcome>,
    /// Summary lines of every declared change
    pub summaries: Vec<String>,
    pub before_hash: u64,
    pub after_hash: u64,
    /// False for dry runs
    pub written: bool,
    #[serde(skip)]
    pub before: String,
    #[serde(skip)]
    pub after: String,
}

impl RunReport {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }

    pub fn noop_rules(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.rules.iter().filter(|r| r.is_noop())
    }
}

/// Read-only evaluation produced by [`check`].
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub ruleset: String,
    pub target: PathBuf,
    /// Match counts against the current file
    pub rules: Vec<RuleOutcome>,
    /// Match counts when the ruleset is re-applied to its own output
    pub reapplied: Vec<RuleOutcome>,
    /// Diagnostics for rules that matched nothing
    pub hints: Vec<Hint>,
}

impl CheckReport {
    /// Rules that would rewrite the file again on a second run.
    pub fn refiring(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.reapplied.iter().filter(|r| !r.is_noop())
    }
}

/// Run `ruleset` over `text` without touching the filesystem.
pub fn apply_to_text(ruleset: &Ruleset, text: &str) -> TextOutcome {
    ruleset.apply(text)
}

/// Apply `ruleset` to the file at `path` and overwrite it with the result.
pub fn run(ruleset: &Ruleset, path: &Path, options: RunOptions) -> Result<RunReport, RunError> {
    let before = read_target(path)?;
    let TextOutcome { output, rules } = apply_to_text(ruleset, &before);

    if options.strict {
        let ids: Vec<String> = rules
            .iter()
            .filter(|r| r.is_noop())
            .map(|r| r.rule_id.clone())
            .collect();
        if !ids.is_empty() {
            return Err(RunError::NoOpRules {
                path: path.to_path_buf(),
                ids,
            });
        }
    }

    if !options.dry_run {
        atomic_write(path, output.as_bytes()).map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            ruleset = %ruleset.name,
            target = %path.display(),
            bytes = output.len(),
            "target written"
        );
    }

    Ok(RunReport {
        ruleset: ruleset.name.clone(),
        target: path.to_path_buf(),
        rules,
        summaries: ruleset.summaries().map(str::to_string).collect(),
        before_hash: xxh3_64(before.as_bytes()),
        after_hash: xxh3_64(output.as_bytes()),
        written: !options.dry_run,
        before,
        after: output,
    })
}

/// Evaluate `ruleset` against the file at `path` without writing anything.
pub fn check(ruleset: &Ruleset, path: &Path) -> Result<CheckReport, RunError> {
    let content = read_target(path)?;

    let mut rules = Vec::with_capacity(ruleset.rules.len());
    let mut hints = Vec::new();
    let mut buffer = content;
    for rule in &ruleset.rules {
        let (next, outcome) = rule.apply(&buffer);
        // Hints are computed against the buffer this rule actually saw.
        // Regex source lines never appear verbatim, so only literals get one.
        if outcome.is_noop() && matches!(rule.pattern, Pattern::Literal(_)) {
            if let Some(hint) = closest_line(&rule.id, rule.pattern.as_str(), &buffer) {
                hints.push(hint);
            }
        }
        buffer = next;
        rules.push(outcome);
    }

    let mut reapplied = Vec::with_capacity(ruleset.rules.len());
    for rule in &ruleset.rules {
        let (next, outcome) = rule.apply(&buffer);
        buffer = next;
        reapplied.push(outcome);
    }

    Ok(CheckReport {
        ruleset: ruleset.name.clone(),
        target: path.to_path_buf(),
        rules,
        reapplied,
        hints,
    })
}

fn read_target(path: &Path) -> Result<String, RunError> {
    fs::read_to_string(path).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomic file write: tempfile in the same directory + fsync + rename.
///
/// Symlinks are followed so the link keeps pointing at the patched file, and
/// the target's permissions carry over to the replacement. The mtime is bumped
/// afterwards so watchers and dev servers pick up the edit.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let path = fs::canonicalize(path)?;
    let permissions = fs::metadata(&path)?.permissions();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.as_file().set_permissions(permissions)?;
    temp.persist(&path).map_err(|e| e.error)?;

    filetime::set_file_mtime(&path, filetime::FileTime::now())?;
    Ok(())
}
