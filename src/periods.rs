use crate::error::{Result, SheetAnalysisError};
use crate::schema::{PeriodRule, PeriodTokenKind};
use chrono::Month;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Granularity of a located header.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Monthly,
    Quarterly,
    Annual,
    Unknown,
}

/// Group a single period column falls into when planning charts.
///
/// Declaration order is the charting priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PeriodGroup {
    Monthly,
    Quarterly,
    Annual,
    Other,
}

impl PeriodGroup {
    pub const PRIORITY: [PeriodGroup; 4] = [
        PeriodGroup::Monthly,
        PeriodGroup::Quarterly,
        PeriodGroup::Annual,
        PeriodGroup::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodGroup::Monthly => "monthly",
            PeriodGroup::Quarterly => "quarterly",
            PeriodGroup::Annual => "annual",
            PeriodGroup::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeriodToken {
    pub kind: PeriodTokenKind,
    /// Canonical lower-case form used to count distinct tokens ("jan" and "January" agree).
    pub key: String,
    pub text: String,
}

#[derive(Debug)]
struct CompiledRule {
    regex: Regex,
    kind: PeriodTokenKind,
}

/// Compiled period token rules, shared by header location and chart planning.
#[derive(Debug)]
pub struct PeriodMatcher {
    rules: Vec<CompiledRule>,
}

impl PeriodMatcher {
    pub fn new(rules: &[PeriodRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|regex| CompiledRule {
                        regex,
                        kind: rule.kind,
                    })
                    .map_err(|source| SheetAnalysisError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// All tokens found in one cell, at most one per rule, in rule order.
    pub fn tokens(&self, cell: &str) -> Vec<PeriodToken> {
        let cell = cell.trim();
        if cell.is_empty() {
            return Vec::new();
        }

        self.rules
            .iter()
            .filter_map(|rule| {
                let caps = rule.regex.captures(cell)?;
                let m = caps.get(1).or_else(|| caps.get(0))?;
                let text = m.as_str().to_string();
                Some(PeriodToken {
                    kind: rule.kind,
                    key: canonical_key(rule.kind, &text),
                    text,
                })
            })
            .collect()
    }

    pub fn year(&self, cell: &str) -> Option<String> {
        self.tokens(cell)
            .into_iter()
            .find(|t| t.kind == PeriodTokenKind::Year)
            .map(|t| t.text)
    }

    pub fn group_of(&self, label: &str) -> PeriodGroup {
        let tokens = self.tokens(label);
        let has = |kind: PeriodTokenKind| tokens.iter().any(|t| t.kind == kind);

        if has(PeriodTokenKind::Month) {
            PeriodGroup::Monthly
        } else if has(PeriodTokenKind::Quarter) {
            PeriodGroup::Quarterly
        } else if has(PeriodTokenKind::FullYear) || has(PeriodTokenKind::Year) {
            PeriodGroup::Annual
        } else {
            PeriodGroup::Other
        }
    }
}

/// Finest granularity present among a set of token kinds.
pub fn period_type_of<I: IntoIterator<Item = PeriodTokenKind>>(kinds: I) -> PeriodType {
    let mut best = PeriodType::Unknown;
    for kind in kinds {
        best = match (best, kind) {
            (_, PeriodTokenKind::Month) => PeriodType::Monthly,
            (PeriodType::Monthly, _) => PeriodType::Monthly,
            (_, PeriodTokenKind::Quarter) => PeriodType::Quarterly,
            (PeriodType::Quarterly, _) => PeriodType::Quarterly,
            (_, PeriodTokenKind::FullYear) | (_, PeriodTokenKind::Year) => PeriodType::Annual,
        };
    }
    best
}

fn canonical_key(kind: PeriodTokenKind, text: &str) -> String {
    let lower = text.to_lowercase();
    match kind {
        PeriodTokenKind::Month => Month::from_str(&lower)
            .map(|m| m.name().to_lowercase())
            .unwrap_or(lower),
        _ => lower.split_whitespace().collect(),
    }
}
