use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// On-disk form of a ruleset, as parsed from TOML.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct RulesetConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub changes: Vec<ChangeDefinition>,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RulesetConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.meta.target.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                rule_id: None,
                field: "meta.target",
            });
        }

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut change_ids = HashSet::new();
        for change in &self.changes {
            if change.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "changes.id",
                });
            }
            if change.summary.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "changes.summary",
                });
            }
            if !change_ids.insert(change.id.as_str()) {
                issues.push(ValidationIssue::DuplicateChange(change.id.clone()));
            }
        }

        let mut rule_ids = HashSet::new();
        for rule in &self.rules {
            let rule_id = (!rule.id.trim().is_empty()).then(|| rule.id.clone());
            if rule_id.is_none() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
            } else if !rule_ids.insert(rule.id.as_str()) {
                issues.push(ValidationIssue::DuplicateRule(rule.id.clone()));
            }

            if let Some(change) = &rule.change {
                if !change_ids.contains(change.as_str()) {
                    issues.push(ValidationIssue::UnknownChange {
                        rule_id: rule_id.clone(),
                        change: change.clone(),
                    });
                }
            }

            match &rule.matcher {
                MatchSpec::Literal { text } => {
                    if text.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule_id,
                            field: "match.text",
                        });
                    }
                }
                MatchSpec::Regex { pattern } => {
                    if pattern.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule_id,
                            field: "match.pattern",
                        });
                        continue;
                    }
                    match Regex::new(pattern) {
                        Ok(_) if matches_zero_width(pattern) => {
                            issues.push(ValidationIssue::InvalidPattern {
                                rule_id,
                                message: "pattern can match zero characters".to_string(),
                            });
                        }
                        Ok(_) => {}
                        Err(e) => issues.push(ValidationIssue::InvalidPattern {
                            rule_id,
                            message: e.to_string(),
                        }),
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Default target file, relative to the working directory
    #[serde(default)]
    pub target: String,
}

/// A logical edit class; one summary line is printed per change.
#[derive(Debug, Deserialize, Clone)]
pub struct ChangeDefinition {
    pub id: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub id: String,
    #[serde(default)]
    pub change: Option<String>,
    #[serde(rename = "match")]
    pub matcher: MatchSpec,
    pub replace: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MatchSpec {
    /// Exact substring
    Literal { text: String },
    Regex { pattern: String },
}

/// True when some match of `pattern` can be empty, e.g. `a*` or `\b`.
///
/// Such a pattern would insert its replacement between characters.
fn matches_zero_width(pattern: &str) -> bool {
    regex_syntax::Parser::new()
        .parse(pattern)
        .map(|hir| hir.properties().minimum_len() == Some(0))
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateRule(String),
    DuplicateChange(String),
    UnknownChange {
        rule_id: Option<String>,
        change: String,
    },
    InvalidPattern {
        rule_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "ruleset contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "ruleset missing required field '{field}'"),
            },
            ValidationIssue::DuplicateRule(id) => write!(f, "duplicate rule id '{id}'"),
            ValidationIssue::DuplicateChange(id) => write!(f, "duplicate change id '{id}'"),
            ValidationIssue::UnknownChange { rule_id, change } => match rule_id {
                Some(id) => write!(f, "rule '{id}' references undeclared change '{change}'"),
                None => write!(f, "rule references undeclared change '{change}'"),
            },
            ValidationIssue::InvalidPattern { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has an invalid regex: {message}"),
                None => write!(f, "invalid regex: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(id: &str, text: &str) -> RuleDefinition {
        RuleDefinition {
            id: id.to_string(),
            change: None,
            matcher: MatchSpec::Literal {
                text: text.to_string(),
            },
            replace: String::new(),
        }
    }

    fn config(rules: Vec<RuleDefinition>) -> RulesetConfig {
        RulesetConfig {
            meta: Metadata {
                name: "t".to_string(),
                description: None,
                target: "file.txt".to_string(),
            },
            changes: Vec::new(),
            rules,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(config(vec![literal("a", "x")]).validate().is_ok());
    }

    #[test]
    fn test_collects_every_issue() {
        let mut cfg = config(vec![literal("a", ""), literal("a", "x")]);
        cfg.meta.target.clear();
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.issues.len(), 3);
        assert!(err
            .issues
            .contains(&ValidationIssue::DuplicateRule("a".to_string())));
    }

    #[test]
    fn test_unknown_change_reference() {
        let mut rule = literal("a", "x");
        rule.change = Some("schema".to_string());
        let err = config(vec![rule]).validate().unwrap_err();
        assert!(matches!(
            &err.issues[0],
            ValidationIssue::UnknownChange { change, .. } if change == "schema"
        ));
    }

    #[test]
    fn test_regex_that_matches_empty_is_rejected() {
        let rule = RuleDefinition {
            id: "r".to_string(),
            change: None,
            matcher: MatchSpec::Regex {
                pattern: "a*".to_string(),
            },
            replace: String::new(),
        };
        let err = config(vec![rule]).validate().unwrap_err();
        assert!(matches!(
            &err.issues[0],
            ValidationIssue::InvalidPattern { .. }
        ));
    }

    #[test]
    fn test_zero_width_assertions_are_rejected() {
        for pattern in [r"\b", "^", "(?m)$", "x|"] {
            let rule = RuleDefinition {
                id: "r".to_string(),
                change: None,
                matcher: MatchSpec::Regex {
                    pattern: pattern.to_string(),
                },
                replace: "!".to_string(),
            };
            let err = config(vec![rule]).validate().unwrap_err();
            assert!(
                matches!(&err.issues[0], ValidationIssue::InvalidPattern { .. }),
                "{pattern} accepted"
            );
        }
    }

    #[test]
    fn test_anchored_word_pattern_is_accepted() {
        let rule = RuleDefinition {
            id: "r".to_string(),
            change: None,
            matcher: MatchSpec::Regex {
                pattern: r"\bORDER\s+BY\b".to_string(),
            },
            replace: String::new(),
        };
        assert!(config(vec![rule]).validate().is_ok());
    }

    #[test]
    fn test_empty_rule_list() {
        let err = config(Vec::new()).validate().unwrap_err();
        assert_eq!(err.issues, vec![ValidationIssue::EmptyRuleList]);
    }
}
