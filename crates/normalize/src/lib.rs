//! Product label normalization.
//!
//! Extracts from the same catalog item are not formatted consistently
//! ("PT7L" vs "PT - 7L", "CXABC" vs "CX - ABC"). Labels are rewritten before
//! grouping so that each item collapses to one canonical label:
//! - Exact rewrites: a whole label is replaced by its spaced form
//! - Spaced prefixes: a ` - ` spacer is inserted after a known prefix, once
//!
//! `normalize_label` is idempotent for any rule set accepted by
//! [`LabelRules::validate`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SPACER: &str = " - ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Empty rewrite source")]
    EmptySource,
    #[error("Invalid spaced prefix '{0}'")]
    InvalidPrefix(String),
    #[error("Rewrite source '{0}' is also a rewrite target")]
    ChainedRewrite(String),
    #[error("Rewrite source '{0}' is already in spaced-prefix form")]
    SpacedSource(String),
}

/// A whole-label rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactRewrite {
    pub from: String,
    pub to: String,
}

impl ExactRewrite {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Rewrite rules applied to every product label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRules {
    /// Applied first; at most one rewrite matches a label
    #[serde(default)]
    pub exact: Vec<ExactRewrite>,

    /// Applied second; the first matching prefix wins
    #[serde(default)]
    pub spaced_prefixes: Vec<String>,
}

impl Default for LabelRules {
    fn default() -> Self {
        Self {
            exact: vec![ExactRewrite::new("PT7L", "PT - 7L")],
            spaced_prefixes: vec!["CX".to_string()],
        }
    }
}

impl LabelRules {
    /// Reject rule sets under which normalization would not be idempotent.
    pub fn validate(&self) -> Result<(), RuleError> {
        for prefix in &self.spaced_prefixes {
            if prefix.is_empty() || prefix.contains(|c: char| c == '-' || c.is_whitespace()) {
                return Err(RuleError::InvalidPrefix(prefix.clone()));
            }
        }

        for rule in &self.exact {
            if rule.from.is_empty() {
                return Err(RuleError::EmptySource);
            }
            if self.exact.iter().any(|other| other.to.trim() == rule.from) {
                return Err(RuleError::ChainedRewrite(rule.from.clone()));
            }
            if self
                .spaced_prefixes
                .iter()
                .any(|p| is_spaced_form(&rule.from, p))
            {
                return Err(RuleError::SpacedSource(rule.from.clone()));
            }
        }

        Ok(())
    }
}

/// Normalize a product label with the given rules.
pub fn normalize_label(label: &str, rules: &LabelRules) -> String {
    let label = label.trim();

    let rewritten = rules
        .exact
        .iter()
        .find(|rule| rule.from == label)
        .map_or(label, |rule| rule.to.trim());

    match rules
        .spaced_prefixes
        .iter()
        .find(|p| rewritten.starts_with(p.as_str()))
    {
        Some(prefix) => space_after_prefix(rewritten, prefix),
        None => rewritten.to_string(),
    }
}

/// Insert the spacer after `prefix`, folding any spacing already there.
fn space_after_prefix(label: &str, prefix: &str) -> String {
    let rest = label[prefix.len()..].trim_start_matches([' ', '-']);
    if rest.is_empty() {
        return label.to_string();
    }
    format!("{prefix}{SPACER}{rest}")
}

fn is_spaced_form(label: &str, prefix: &str) -> bool {
    label.starts_with(prefix) && space_after_prefix(label, prefix) == label
}
