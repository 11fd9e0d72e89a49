use crate::error::SourceError;
use crate::formula::{extract_row_references, is_formula};
use crate::schema::AnalyzerConfig;
use crate::source::FormulaSource;
use crate::table::{Dataset, DatasetRow};
use crate::utils::{contains_any, label_words};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of a best-effort lookup.
///
/// `Degraded` carries a usable value obtained after a dependency failed; `Empty` means
/// nothing was found, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution<T> {
    Found(T),
    Degraded { value: T, reason: String },
    Empty { reason: String },
}

impl<T> Resolution<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Resolution::Found(value) | Resolution::Degraded { value, .. } => Some(value),
            Resolution::Empty { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Resolution::Found(value) | Resolution::Degraded { value, .. } => Some(value),
            Resolution::Empty { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Resolution::Degraded { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStrategy {
    Formula,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentLink {
    pub summary_row_index: usize,
    /// Ascending for formula links; nearest-first for heuristic links, as the rows were
    /// scanned upwards from the summary.
    pub component_row_indices: Vec<usize>,
    /// Labels in the same order as `component_row_indices`.
    pub component_labels: Vec<String>,
    pub strategy: ComponentStrategy,
}

impl ComponentLink {
    fn new(
        dataset: &Dataset,
        summary_row_index: usize,
        rows: Vec<usize>,
        strategy: ComponentStrategy,
    ) -> Self {
        let component_labels = rows
            .iter()
            .filter_map(|&i| dataset.row(i))
            .map(|row| row.label().to_string())
            .collect();
        Self {
            summary_row_index,
            component_row_indices: rows,
            component_labels,
            strategy,
        }
    }

    /// `(row index, label)` pairs in link order.
    pub fn components(&self) -> impl Iterator<Item = (usize, &str)> {
        self.component_row_indices
            .iter()
            .copied()
            .zip(self.component_labels.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.component_row_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.component_row_indices.is_empty()
    }
}

/// Finds the rows a summary row is built from.
pub struct ComponentResolver<'a> {
    config: &'a AnalyzerConfig,
}

impl<'a> ComponentResolver<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Traces formulas when a source is given and falls back to label heuristics.
    pub fn resolve(
        &self,
        dataset: &Dataset,
        summary_row_index: usize,
        formulas: Option<&dyn FormulaSource>,
    ) -> Resolution<ComponentLink> {
        let Some(summary) = dataset.row(summary_row_index) else {
            return Resolution::Empty {
                reason: format!("row {} is outside the dataset", summary_row_index),
            };
        };

        let mut failure: Option<SourceError> = None;
        if let Some(source) = formulas {
            match self.trace_formulas(dataset, summary_row_index, source) {
                Ok(rows) if !rows.is_empty() => {
                    debug!(
                        "Resolved {} components for '{}' from formulas",
                        rows.len(),
                        summary.label()
                    );
                    return Resolution::Found(ComponentLink::new(
                        dataset,
                        summary_row_index,
                        rows,
                        ComponentStrategy::Formula,
                    ));
                }
                Ok(_) => {}
                Err(SourceError::Unsupported) => {}
                Err(e) => {
                    warn!(
                        "Formula lookup for '{}' failed, using label heuristics: {}",
                        summary.label(),
                        e
                    );
                    failure = Some(e);
                }
            }
        }

        let rows = self.match_labels(dataset, summary_row_index);
        debug!(
            "Resolved {} components for '{}' from labels",
            rows.len(),
            summary.label()
        );

        match (rows.is_empty(), failure) {
            (true, None) => Resolution::Empty {
                reason: "no component rows found".to_string(),
            },
            (true, Some(e)) => Resolution::Empty {
                reason: format!("formula lookup failed ({}); no component rows found", e),
            },
            (false, None) => Resolution::Found(ComponentLink::new(
                dataset,
                summary_row_index,
                rows,
                ComponentStrategy::Heuristic,
            )),
            (false, Some(e)) => Resolution::Degraded {
                value: ComponentLink::new(
                    dataset,
                    summary_row_index,
                    rows,
                    ComponentStrategy::Heuristic,
                ),
                reason: format!("formula lookup failed: {}", e),
            },
        }
    }

    /// Rows referenced by formulas in the summary row, excluding summary rows and rows
    /// without data. Issues exactly one lookup.
    fn trace_formulas(
        &self,
        dataset: &Dataset,
        summary_row_index: usize,
        source: &dyn FormulaSource,
    ) -> Result<Vec<usize>, SourceError> {
        let Some(summary) = dataset.row(summary_row_index) else {
            return Ok(Vec::new());
        };
        let grid_row = summary.source_row;
        let formulas = source.cell_formulas(grid_row..grid_row + 1)?;
        let Some(sheet_rows) = dataset.sheet_rows() else {
            return Ok(Vec::new());
        };

        let referenced: BTreeSet<usize> = formulas
            .iter()
            .flatten()
            .flatten()
            .filter(|text| is_formula(text))
            .flat_map(|text| extract_row_references(text, sheet_rows.clone()))
            .collect();

        Ok(referenced
            .into_iter()
            .filter_map(|sheet_row| dataset.index_of_source_row(sheet_row - 1))
            .filter(|&index| index != summary_row_index)
            .filter(|&index| {
                dataset
                    .row(index)
                    .is_some_and(|row| self.is_component_candidate(row))
            })
            .collect())
    }

    /// Scans the rows directly above the summary row for related line items, nearest first.
    fn match_labels(&self, dataset: &Dataset, summary_row_index: usize) -> Vec<usize> {
        let Some(summary) = dataset.row(summary_row_index) else {
            return Vec::new();
        };
        let summary_label = summary.label().to_lowercase();
        let summary_words = label_words(&summary_label);
        let has_general_term = self
            .config
            .general_terms
            .iter()
            .any(|term| summary_words.contains(term));

        let start = summary_row_index.saturating_sub(self.config.component_window);
        (start..summary_row_index)
            .rev()
            .filter(|&index| {
                let Some(row) = dataset.row(index) else {
                    return false;
                };
                if !self.is_component_candidate(row) {
                    return false;
                }

                let label = row.label().to_lowercase();
                let words = label_words(&label);
                let shares_term = self
                    .config
                    .shared_terms
                    .iter()
                    .any(|term| summary_words.contains(term) && words.contains(term));
                let is_more_specific = has_general_term
                    && self
                        .config
                        .specific_terms
                        .iter()
                        .any(|term| words.contains(term));
                let is_revenue_stream =
                    summary_label.contains("revenue") && label.contains("stream");

                shares_term || is_more_specific || is_revenue_stream
            })
            .collect()
    }

    fn is_component_candidate(&self, row: &DatasetRow) -> bool {
        !contains_any(row.label(), &self.config.summary_keywords) && has_nonzero_data(row)
    }
}

fn has_nonzero_data(row: &DatasetRow) -> bool {
    row.cells
        .iter()
        .skip(1)
        .any(|cell| cell.value.is_some_and(|v| v != 0.0))
}
