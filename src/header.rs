use crate::periods::{period_type_of, PeriodMatcher, PeriodType};
use crate::schema::{AnalyzerConfig, PeriodTokenKind};
use crate::source::RawGrid;
use crate::utils::{cell_at, is_blank, is_blank_row};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStrategy {
    /// One row carries both periods and a year.
    SingleRow,
    /// A year row and a period row were combined.
    MultiRow,
    /// No period header was found; the first non-empty row is used as-is.
    FirstNonEmpty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub header_row_index: usize,
    /// One label per column; column 0 titles the label column.
    pub header_labels: Vec<String>,
    pub periods: Vec<String>,
    pub period_type: PeriodType,
    pub year: Option<String>,
    /// First raw-grid row holding data. For a split header this is past both header rows.
    pub data_start_index: usize,
    pub strategy: HeaderStrategy,
}

impl HeaderInfo {
    fn first_non_empty(grid: &RawGrid) -> Self {
        match grid.iter().position(|row| !is_blank_row(row)) {
            Some(index) => Self {
                header_row_index: index,
                header_labels: grid[index].iter().map(|c| c.trim().to_string()).collect(),
                periods: Vec::new(),
                period_type: PeriodType::Unknown,
                year: None,
                data_start_index: index + 1,
                strategy: HeaderStrategy::FirstNonEmpty,
            },
            None => Self {
                header_row_index: 0,
                header_labels: Vec::new(),
                periods: Vec::new(),
                period_type: PeriodType::Unknown,
                year: None,
                data_start_index: grid.len(),
                strategy: HeaderStrategy::FirstNonEmpty,
            },
        }
    }
}

#[derive(Debug, Default)]
struct RowContent {
    non_empty: usize,
    year_cells: usize,
    period_cells: usize,
    year: Option<String>,
    period_kinds: Vec<PeriodTokenKind>,
}

pub struct HeaderLocator<'a> {
    matcher: &'a PeriodMatcher,
    min_period_tokens: usize,
    period_cell_ratio: f64,
}

impl<'a> HeaderLocator<'a> {
    pub fn new(matcher: &'a PeriodMatcher, config: &AnalyzerConfig) -> Self {
        Self {
            matcher,
            min_period_tokens: config.min_header_period_tokens,
            period_cell_ratio: config.period_cell_ratio,
        }
    }

    pub fn locate(&self, grid: &RawGrid) -> HeaderInfo {
        if let Some(info) = self.single_row_header(grid) {
            debug!(
                "Single-row header at row {} ({:?}, year {:?})",
                info.header_row_index, info.period_type, info.year
            );
            return info;
        }

        if let Some(info) = self.multi_row_header(grid) {
            debug!(
                "Split header combined at row {} ({:?}, year {:?})",
                info.header_row_index, info.period_type, info.year
            );
            return info;
        }

        let info = HeaderInfo::first_non_empty(grid);
        debug!(
            "No period header found; using row {} as header",
            info.header_row_index
        );
        info
    }

    fn single_row_header(&self, grid: &RawGrid) -> Option<HeaderInfo> {
        for (index, row) in grid.iter().enumerate() {
            if is_blank_row(row) {
                continue;
            }

            let mut keys = HashSet::new();
            let mut kinds = Vec::new();
            let mut year = None;
            let mut period_columns = 0;
            for (col, cell) in row.iter().enumerate() {
                let tokens = self.matcher.tokens(cell);
                if col > 0 && !tokens.is_empty() {
                    period_columns += 1;
                }
                for token in tokens {
                    if token.kind == PeriodTokenKind::Year && year.is_none() {
                        year = Some(token.text.clone());
                    }
                    kinds.push(token.kind);
                    keys.insert(token.key);
                }
            }

            // Period tokens must come from at least two columns past the label column.
            if keys.len() < self.min_period_tokens || year.is_none() || period_columns < 2 {
                continue;
            }

            // A bare year row directly above or below a period row belongs to a split header.
            if self.analyze_row(row).has_only_years(self.period_cell_ratio)
                && self.has_period_neighbour(grid, index)
            {
                continue;
            }

            let labels: Vec<String> = row.iter().map(|c| c.trim().to_string()).collect();
            return Some(HeaderInfo {
                header_row_index: index,
                periods: labels.iter().skip(1).cloned().collect(),
                header_labels: labels,
                period_type: period_type_of(kinds),
                year,
                data_start_index: index + 1,
                strategy: HeaderStrategy::SingleRow,
            });
        }

        None
    }

    fn has_period_neighbour(&self, grid: &RawGrid, index: usize) -> bool {
        let neighbours = [index.checked_sub(1), Some(index + 1)];
        neighbours
            .into_iter()
            .flatten()
            .filter_map(|i| grid.get(i))
            .any(|row| self.is_period_row(&self.analyze_row(row)))
    }

    fn multi_row_header(&self, grid: &RawGrid) -> Option<HeaderInfo> {
        for index in 0..grid.len().saturating_sub(1) {
            let current = &grid[index];
            let next = &grid[index + 1];
            if is_blank_row(current) || is_blank_row(next) {
                continue;
            }

            let current_content = self.analyze_row(current);
            let next_content = self.analyze_row(next);

            let (year_row, year_content, period_row, period_content, period_index) =
                if current_content.has_only_years(self.period_cell_ratio)
                    && self.is_period_row(&next_content)
                {
                    (current, current_content, next, next_content, index + 1)
                } else if next_content.has_only_years(self.period_cell_ratio)
                    && self.is_period_row(&current_content)
                {
                    (next, next_content, current, current_content, index)
                } else {
                    continue;
                };

            let year = year_content.year.clone();
            let labels = self.combine_rows(year_row, period_row, year.as_deref().unwrap_or(""));
            return Some(HeaderInfo {
                header_row_index: period_index,
                periods: labels.iter().skip(1).cloned().collect(),
                header_labels: labels,
                period_type: period_type_of(period_content.period_kinds),
                year,
                data_start_index: index + 2,
                strategy: HeaderStrategy::MultiRow,
            });
        }

        None
    }

    fn is_period_row(&self, content: &RowContent) -> bool {
        content.has_only_periods(self.period_cell_ratio)
            && content.period_cells >= self.min_period_tokens
    }

    fn analyze_row(&self, row: &[String]) -> RowContent {
        let mut content = RowContent::default();

        for cell in row.iter().filter(|c| !is_blank(c)) {
            content.non_empty += 1;
            let tokens = self.matcher.tokens(cell);

            if let Some(year) = tokens.iter().find(|t| t.kind == PeriodTokenKind::Year) {
                content.year_cells += 1;
                if content.year.is_none() {
                    content.year = Some(year.text.clone());
                }
            }

            let kinds: Vec<PeriodTokenKind> = tokens
                .iter()
                .map(|t| t.kind)
                .filter(|k| k.is_period())
                .collect();
            if !kinds.is_empty() {
                content.period_cells += 1;
                content.period_kinds.extend(kinds);
            }
        }

        content
    }

    /// Merges a year row and a period row into one label per column.
    ///
    /// Year cells are carried rightwards so a year written once above a span of periods
    /// applies to the whole span.
    fn combine_rows(
        &self,
        year_row: &[String],
        period_row: &[String],
        default_year: &str,
    ) -> Vec<String> {
        let width = year_row.len().max(period_row.len());
        let mut current_year = default_year.to_string();
        let mut combined = Vec::with_capacity(width);

        for col in 0..width {
            let year_cell = cell_at(year_row, col).trim();
            let period_cell = cell_at(period_row, col).trim();

            if col == 0 {
                let title = if year_cell.is_empty() { period_cell } else { year_cell };
                combined.push(title.to_string());
                continue;
            }

            if let Some(year) = self.matcher.year(year_cell) {
                current_year = year;
            }

            let kinds: Vec<PeriodTokenKind> = self
                .matcher
                .tokens(period_cell)
                .into_iter()
                .map(|t| t.kind)
                .filter(|k| k.is_period())
                .collect();

            let label = if kinds.is_empty() {
                let fallback = if year_cell.is_empty() { period_cell } else { year_cell };
                fallback.to_string()
            } else if kinds.iter().all(|k| *k == PeriodTokenKind::FullYear) {
                format!("Full Year {}", current_year)
            } else {
                format!("{} {}", period_cell.to_uppercase(), current_year)
            };
            combined.push(label.trim().to_string());
        }

        combined
    }
}

impl RowContent {
    fn has_only_years(&self, ratio: f64) -> bool {
        self.year_cells > 0
            && self.period_cells == 0
            && self.year_cells as f64 >= self.non_empty as f64 * ratio
    }

    fn has_only_periods(&self, ratio: f64) -> bool {
        self.period_cells > 0
            && self.year_cells == 0
            && self.period_cells as f64 >= self.non_empty as f64 * ratio
    }
}
