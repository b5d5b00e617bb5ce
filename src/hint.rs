//! Drift diagnostics for rules that matched nothing.
//!
//! Purely advisory: a hint never changes what a rule matches.

use serde::Serialize;
use std::fmt;
use strsim::normalized_levenshtein;

/// Lines scoring below this are not worth suggesting.
const MIN_SIMILARITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hint {
    pub rule_id: String,
    /// First pattern line that does not occur anywhere in the text.
    /// `None` when every line exists but not as one contiguous block.
    pub missing: Option<String>,
    /// Best candidate in the text for the missing line
    pub closest: Option<LineMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineMatch {
    /// 1-based line number in the target
    pub line: usize,
    pub text: String,
    pub similarity: f64,
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.missing, &self.closest) {
            (None, _) => write!(
                f,
                "{}: every pattern line exists, but not as one contiguous block",
                self.rule_id
            ),
            (Some(missing), None) => {
                write!(f, "{}: no line resembles {:?}", self.rule_id, missing.trim())
            }
            (Some(missing), Some(closest)) => write!(
                f,
                "{}: expected {:?}, closest is line {}: {:?} ({:.0}% similar)",
                self.rule_id,
                missing.trim(),
                closest.line,
                closest.text.trim(),
                closest.similarity * 100.0
            ),
        }
    }
}

/// Explain why `pattern` is absent from `text`.
///
/// Returns `None` for an empty pattern.
pub fn closest_line(rule_id: &str, pattern: &str, text: &str) -> Option<Hint> {
    let mut lines = pattern.lines().filter(|l| !l.trim().is_empty()).peekable();
    lines.peek()?;

    let missing = lines.find(|line| !text.contains(*line));
    let closest = missing.and_then(|wanted| {
        let wanted = wanted.trim();
        text.lines()
            .enumerate()
            .map(|(idx, line)| LineMatch {
                line: idx + 1,
                text: line.to_string(),
                similarity: normalized_levenshtein(wanted, line.trim()),
            })
            .filter(|m| m.similarity >= MIN_SIMILARITY)
            .max_by(|a, b| a.similarity.total_cmp(&b.similarity))
    });

    Some(Hint {
        rule_id: rule_id.to_string(),
        missing: missing.map(str::to_string),
        closest,
    })
}
