//! Compiled rulesets and the pure text pipeline.
//!
//! A [`Ruleset`] is the validated, compiled form of a [`RulesetConfig`]. Rules
//! run strictly in declaration order and each one sees the output of the
//! previous rule, never the original text.

use crate::config::schema::{MatchSpec, RulesetConfig, ValidationError, ValidationIssue};
use crate::rule::{Pattern, Rule, RuleOutcome};
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;

/// A logical edit class with its one-line summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub id: String,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct Ruleset {
    pub name: String,
    pub description: Option<String>,
    /// Default target file, relative to the working directory
    pub target: PathBuf,
    pub changes: Vec<Change>,
    pub rules: Vec<Rule>,
}

/// Result of running every rule over a text buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOutcome {
    pub output: String,
    /// One entry per rule, in application order
    pub rules: Vec<RuleOutcome>,
}

impl TextOutcome {
    /// Rules that matched nothing.
    pub fn noop_rules(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.rules.iter().filter(|r| r.is_noop())
    }

    /// Rules that replaced more than one occurrence.
    pub fn duplicate_matches(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.rules.iter().filter(|r| r.matches > 1)
    }

    pub fn total_matches(&self) -> usize {
        self.rules.iter().map(|r| r.matches).sum()
    }

    pub fn fired(&self, rule_id: &str) -> Option<usize> {
        self.rules
            .iter()
            .find(|r| r.rule_id == rule_id)
            .map(|r| r.matches)
    }
}

impl Ruleset {
    pub fn new(name: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            description: None,
            target: target.into(),
            changes: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn with_change(mut self, id: impl Into<String>, summary: impl Into<String>) -> Self {
        self.changes.push(Change {
            id: id.into(),
            summary: summary.into(),
        });
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Run every rule over `text` in order.
    pub fn apply(&self, text: &str) -> TextOutcome {
        let mut buffer = text.to_string();
        let mut outcomes = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let (next, outcome) = rule.apply(&buffer);
            if outcome.is_noop() {
                tracing::warn!(ruleset = %self.name, rule = %rule.id, "rule matched nothing");
            } else {
                tracing::debug!(
                    ruleset = %self.name,
                    rule = %rule.id,
                    matches = outcome.matches,
                    "rule applied"
                );
            }
            buffer = next;
            outcomes.push(outcome);
        }

        TextOutcome {
            output: buffer,
            rules: outcomes,
        }
    }

    /// Summary lines for every declared change, in declaration order.
    pub fn summaries(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.summary.as_str())
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }
}

impl TryFrom<RulesetConfig> for Ruleset {
    type Error = ValidationError;

    fn try_from(config: RulesetConfig) -> Result<Self, Self::Error> {
        config.validate()?;

        let mut rules = Vec::with_capacity(config.rules.len());
        for def in config.rules {
            let pattern = match def.matcher {
                MatchSpec::Literal { text } => Pattern::Literal(text),
                MatchSpec::Regex { pattern } => {
                    let re = Regex::new(&pattern).map_err(|e| ValidationError {
                        issues: vec![ValidationIssue::InvalidPattern {
                            rule_id: Some(def.id.clone()),
                            message: e.to_string(),
                        }],
                    })?;
                    Pattern::Regex(re)
                }
            };
            rules.push(Rule {
                id: def.id,
                change: def.change,
                pattern,
                replace: def.replace,
            });
        }

        Ok(Self {
            name: config.meta.name,
            description: config.meta.description,
            target: PathBuf::from(config.meta.target),
            changes: config
                .changes
                .into_iter()
                .map(|c| Change {
                    id: c.id,
                    summary: c.summary,
                })
                .collect(),
            rules,
        })
    }
}
