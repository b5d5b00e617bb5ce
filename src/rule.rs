use regex::{Captures, Regex};
use serde::Serialize;

/// A single find-and-replace step applied to a text buffer.
///
/// Every non-overlapping occurrence of the pattern is replaced. A rule whose
/// pattern is absent leaves the buffer untouched and reports zero matches.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Identifier, unique within a ruleset
    pub id: String,
    /// Id of the change this rule contributes to, if any
    pub change: Option<String>,
    /// What to look for
    pub pattern: Pattern,
    /// Literal replacement text (no capture expansion)
    pub replace: String,
}

/// Match strategy for a [`Rule`].
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Exact substring match
    Literal(String),
    /// Regular expression; replacement text is still inserted verbatim
    Regex(Regex),
}

impl Pattern {
    /// Source text of the pattern, as written in the ruleset.
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Literal(text) => text,
            Pattern::Regex(re) => re.as_str(),
        }
    }

    /// Count non-overlapping occurrences in `text`.
    ///
    /// Empty regex matches are not occurrences.
    pub fn count_in(&self, text: &str) -> usize {
        match self {
            Pattern::Literal(needle) if needle.is_empty() => 0,
            Pattern::Literal(needle) => text.matches(needle.as_str()).count(),
            Pattern::Regex(re) => re.find_iter(text).filter(|m| !m.is_empty()).count(),
        }
    }
}

/// What a rule did to the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub rule_id: String,
    pub change: Option<String>,
    /// Number of occurrences replaced; zero means the rule was a no-op
    pub matches: usize,
}

impl RuleOutcome {
    pub fn is_noop(&self) -> bool {
        self.matches == 0
    }
}

impl Rule {
    /// Create a literal rule with no change reference.
    pub fn literal(
        id: impl Into<String>,
        search: impl Into<String>,
        replace: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            change: None,
            pattern: Pattern::Literal(search.into()),
            replace: replace.into(),
        }
    }

    /// Attach this rule to a declared change.
    pub fn in_change(mut self, change: impl Into<String>) -> Self {
        self.change = Some(change.into());
        self
    }

    /// Apply the rule to `text`, returning the rewritten buffer and the outcome.
    ///
    /// When nothing matches the input is returned unchanged, byte for byte.
    pub fn apply(&self, text: &str) -> (String, RuleOutcome) {
        let matches = self.pattern.count_in(text);
        let output = if matches == 0 {
            text.to_string()
        } else {
            match &self.pattern {
                Pattern::Literal(needle) => text.replace(needle.as_str(), &self.replace),
                Pattern::Regex(re) => re
                    .replace_all(text, |caps: &Captures<'_>| {
                        if caps[0].is_empty() {
                            String::new()
                        } else {
                            self.replace.clone()
                        }
                    })
                    .into_owned(),
            }
        };

        (
            output,
            RuleOutcome {
                rule_id: self.id.clone(),
                change: self.change.clone(),
                matches,
            },
        )
    }
}
