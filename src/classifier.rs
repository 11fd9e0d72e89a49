use crate::schema::{AnalyzerConfig, RowCategory};
use crate::table::DatasetRow;
use crate::utils::{contains_any, mean, sum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub row_index: usize,
    pub label: String,
    pub category: RowCategory,
    pub is_important: bool,
    pub is_summary: bool,
    /// Non-empty numeric values in column order.
    pub numeric_values: Vec<f64>,
    pub total: f64,
    pub average: Option<f64>,
    /// Column the values were read from (1, or 2 when data sits one column further right).
    pub value_column: usize,
}

impl RowRecord {
    pub fn has_data(&self) -> bool {
        !self.numeric_values.is_empty()
    }
}

pub struct RowClassifier<'a> {
    config: &'a AnalyzerConfig,
}

impl<'a> RowClassifier<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, row_index: usize, row: &DatasetRow) -> RowRecord {
        let label = row.label().to_string();
        let (value_column, numeric_values) = numeric_alignment(row);

        let total = sum(&numeric_values);
        let average = mean(&numeric_values);
        let has_significant_values =
            !numeric_values.is_empty() && numeric_values.iter().map(|v| v.abs()).sum::<f64>() > 0.0;

        RowRecord {
            row_index,
            category: self.category(&label),
            is_important: has_significant_values
                && contains_any(&label, &self.config.important_keywords),
            is_summary: self.is_summary_label(&label),
            label,
            numeric_values,
            total,
            average,
            value_column,
        }
    }

    pub fn category(&self, label: &str) -> RowCategory {
        self.config
            .category_rules
            .iter()
            .find(|rule| contains_any(label, &rule.keywords))
            .map(|rule| rule.category)
            .unwrap_or(RowCategory::Other)
    }

    pub fn is_summary_label(&self, label: &str) -> bool {
        contains_any(label, &self.config.summary_keywords)
    }
}

/// Reads values from column 1, or from column 2 when column 1 holds leftover label text.
///
/// Column 2 reads a suffix of the same cells, so it never yields more numbers than
/// column 1. It is picked when a label column survived the hierarchy pass and the numbers
/// start one column later.
fn numeric_alignment(row: &DatasetRow) -> (usize, Vec<f64>) {
    let from_first: Vec<f64> = row.values_from(1).into_iter().flatten().collect();
    let from_second: Vec<f64> = row.values_from(2).into_iter().flatten().collect();
    let leftover_label = row
        .cells
        .get(1)
        .is_some_and(|cell| cell.value.is_none() && !cell.raw.trim().is_empty());

    if leftover_label && !from_second.is_empty() {
        (2, from_second)
    } else {
        (1, from_first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn row(cells: &[&str]) -> DatasetRow {
        DatasetRow {
            source_row: 4,
            cells: cells
                .iter()
                .enumerate()
                .map(|(i, c)| if i == 0 { Cell::text(c) } else { Cell::parsed(c) })
                .collect(),
        }
    }

    #[test]
    fn test_categories_follow_rule_order() {
        let config = AnalyzerConfig::default();
        let classifier = RowClassifier::new(&config);
        assert_eq!(classifier.category("Product Sales"), RowCategory::Revenue);
        assert_eq!(classifier.category("Cost of Goods Sold"), RowCategory::Expense);
        assert_eq!(classifier.category("Gross Profit"), RowCategory::Profit);
        assert_eq!(classifier.category("Current Liabilities"), RowCategory::BalanceSheet);
        assert_eq!(classifier.category("Headcount"), RowCategory::Other);
        // "income" is a revenue keyword and is checked before profit keywords.
        assert_eq!(classifier.category("Net Income"), RowCategory::Revenue);
    }

    #[test]
    fn test_summary_and_important_flags() {
        let config = AnalyzerConfig::default();
        let classifier = RowClassifier::new(&config);

        let total = classifier.classify(2, &row(&["Total Profit", "400", "440"]));
        assert!(total.is_summary);
        assert!(total.is_important);
        assert_eq!(total.category, RowCategory::Profit);
        assert_eq!(total.total, 840.0);
        assert_eq!(total.average, Some(420.0));

        let zero = classifier.classify(3, &row(&["Marketing", "0", "0"]));
        assert!(!zero.is_important);
        assert!(!zero.is_summary);

        let headcount = classifier.classify(4, &row(&["Headcount", "12", "14"]));
        assert!(!headcount.is_important);
    }

    #[test]
    fn test_row_without_numbers_has_empty_record() {
        let config = AnalyzerConfig::default();
        let record = RowClassifier::new(&config).classify(0, &row(&["REVENUE", "", ""]));
        assert!(!record.has_data());
        assert_eq!(record.total, 0.0);
        assert_eq!(record.average, None);
        assert!(!record.is_important);
    }

    #[test]
    fn test_classification_is_repeatable() {
        let config = AnalyzerConfig::default();
        let classifier = RowClassifier::new(&config);
        let data = row(&["Operating Expenses", "(1,200)", "$900", "n/a"]);
        let first = classifier.classify(7, &data);
        let second = classifier.classify(7, &data);
        assert_eq!(first, second);
        assert_eq!(first.numeric_values, vec![-1200.0, 900.0]);
        assert_eq!(first.value_column, 1);
    }

    #[test]
    fn test_leftover_label_column_shifts_alignment() {
        let config = AnalyzerConfig::default();
        let classifier = RowClassifier::new(&config);

        let shifted = classifier.classify(1, &row(&["Salaries", "Payroll", "30", "31"]));
        assert_eq!(shifted.value_column, 2);
        assert_eq!(shifted.numeric_values, vec![30.0, 31.0]);

        let gap = classifier.classify(2, &row(&["Revenue", "", "10", "12"]));
        assert_eq!(gap.value_column, 1);

        let label_only = classifier.classify(3, &row(&["Revenue", "Notes"]));
        assert_eq!(label_only.value_column, 1);
        assert!(!label_only.has_data());
    }
}
