//! Retrofit Patcher: ordered find-and-replace rulesets for one-shot migrations
//!
//! A ruleset is an ordered list of exact-match rules applied to a single target
//! file. The target is read whole, every rule rewrites the output of the
//! previous one, and the result is written back in one atomic replace.
//!
//! # Caveats
//!
//! - Each rule replaces *every* occurrence of its pattern, not just the first
//! - A rule whose pattern is absent is a silent no-op; the run still succeeds
//!   unless [`RunOptions::strict`] is set
//! - Re-running a ruleset is only safe for rules whose replacement destroys
//!   their own pattern; [`check`] reports which rules would fire again
//!
//! # Example
//!
//! ```no_run
//! use retrofit_patcher::{run, Rule, RunOptions, Ruleset};
//! use std::path::Path;
//!
//! let ruleset = Ruleset::new("rename", "main.js")
//!     .with_change("rename", "old_name renamed to new_name")
//!     .with_rule(Rule::literal("rename", "old_name", "new_name").in_change("rename"));
//!
//! match run(&ruleset, Path::new("main.js"), RunOptions::default()) {
//!     Ok(report) => println!("{} rule(s) matched nothing", report.noop_rules().count()),
//!     Err(e) => eprintln!("run failed: {}", e),
//! }
//! ```

pub mod builtin;
pub mod config;
pub mod hint;
pub mod retrofit;
pub mod rule;
pub mod ruleset;
pub mod runner;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, RulesetConfig, ValidationError};
pub use hint::{closest_line, Hint};
pub use retrofit::{ColumnRetrofit, TableAnchor};
pub use rule::{Pattern, Rule, RuleOutcome};
pub use ruleset::{Change, Ruleset, TextOutcome};
pub use runner::{apply_to_text, check, run, CheckReport, RunError, RunOptions, RunReport};
