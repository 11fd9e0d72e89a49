use crate::classifier::RowRecord;
use crate::utils::{mean, sum};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Period-over-period changes of one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub absolute_changes: Vec<f64>,
    pub percentage_changes: Vec<f64>,
    pub total_change: f64,
    pub average_change: f64,
    pub trend: Trend,
}

impl Movement {
    pub fn has_changes(&self) -> bool {
        !self.absolute_changes.is_empty()
    }
}

/// Compares each value with its predecessor. Pairs with a missing value or a zero
/// predecessor contribute nothing.
pub fn analyze(values: &[Option<f64>]) -> Movement {
    let (absolute_changes, percentage_changes): (Vec<f64>, Vec<f64>) = values
        .windows(2)
        .filter_map(|pair| match (pair[0], pair[1]) {
            (Some(prev), Some(curr)) if prev != 0.0 => {
                let change = curr - prev;
                Some((change, change / prev * 100.0))
            }
            _ => None,
        })
        .unzip();

    let total_change = sum(&absolute_changes);
    let average_change = mean(&absolute_changes).unwrap_or(0.0);
    let trend = if average_change > 0.0 {
        Trend::Increasing
    } else if average_change < 0.0 {
        Trend::Decreasing
    } else {
        Trend::Stable
    };

    Movement {
        absolute_changes,
        percentage_changes,
        total_change,
        average_change,
        trend,
    }
}

/// Per-row summary shown next to each analyzed row.
pub fn commentary(record: &RowRecord, movement: &Movement) -> String {
    let Some(average) = record.average else {
        return format!("{}: No numeric data available for analysis", record.label);
    };
    let min = record
        .numeric_values
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let max = record
        .numeric_values
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    let mut text = format!("{}:\n", record.label);
    let _ = writeln!(text, "  Total: {:.2}", record.total);
    let _ = writeln!(text, "  Average: {:.2}", average);
    let _ = writeln!(text, "  Range: {:.2} to {:.2}", min, max);
    let _ = writeln!(text, "  Type: {}", record.category.as_str());
    let _ = writeln!(text, "  Trend: {}", movement.trend);
    let _ = writeln!(text, "  Average Change: {:.2}", movement.average_change);
    let _ = writeln!(text, "  Total Change: {:.2}", movement.total_change);
    let insight = match movement.trend {
        Trend::Increasing => "This metric shows a positive trend with consistent growth.",
        Trend::Decreasing => "This metric shows a declining trend that may need attention.",
        Trend::Stable => "This metric shows a stable pattern with minimal variation.",
    };
    let _ = writeln!(text, "  {}", insight);
    text
}

/// Short narrative used when several rows are compared side by side.
pub fn movement_commentary(label: &str, movement: &Movement) -> String {
    if !movement.has_changes() {
        return format!("No significant changes observed for {}.", label);
    }

    let mut text = format!("Analysis for {}:\n", label);
    let _ = match movement.trend {
        Trend::Increasing => writeln!(
            text,
            "- Shows an increasing trend with average change of {:.2}",
            movement.average_change
        ),
        Trend::Decreasing => writeln!(
            text,
            "- Shows a decreasing trend with average change of {:.2}",
            movement.average_change
        ),
        Trend::Stable => writeln!(text, "- Shows a stable trend with minimal changes"),
    };
    let _ = writeln!(
        text,
        "- Total change across all periods: {:.2}",
        movement.total_change
    );

    let magnitude = movement.average_change.abs();
    let band = if magnitude > 10.0 {
        "- Significant volatility observed"
    } else if magnitude > 5.0 {
        "- Moderate changes observed"
    } else {
        "- Relatively stable performance"
    };
    let _ = writeln!(text, "{}", band);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RowCategory;

    fn record(label: &str, values: &[f64]) -> RowRecord {
        RowRecord {
            row_index: 0,
            label: label.to_string(),
            category: RowCategory::Revenue,
            is_important: true,
            is_summary: false,
            numeric_values: values.to_vec(),
            total: sum(values),
            average: mean(values),
            value_column: 1,
        }
    }

    #[test]
    fn test_compound_growth() {
        let movement = analyze(&[Some(100.0), Some(110.0), Some(121.0)]);
        assert_eq!(movement.absolute_changes, vec![10.0, 11.0]);
        assert_eq!(movement.percentage_changes.len(), 2);
        for pct in &movement.percentage_changes {
            assert!((pct - 10.0).abs() < 1e-9);
        }
        assert_eq!(movement.total_change, 21.0);
        assert_eq!(movement.average_change, 10.5);
        assert_eq!(movement.trend, Trend::Increasing);
    }

    #[test]
    fn test_missing_and_zero_predecessors_are_skipped() {
        let movement = analyze(&[Some(0.0), Some(50.0), None, Some(40.0), Some(30.0)]);
        assert_eq!(movement.absolute_changes, vec![-10.0]);
        assert_eq!(movement.trend, Trend::Decreasing);
    }

    #[test]
    fn test_no_pairs_is_stable() {
        let movement = analyze(&[Some(5.0)]);
        assert!(!movement.has_changes());
        assert_eq!(movement.trend, Trend::Stable);
        assert_eq!(movement.average_change, 0.0);
        assert_eq!(
            movement_commentary("Revenue", &movement),
            "No significant changes observed for Revenue."
        );
    }

    #[test]
    fn test_row_commentary() {
        let values = [100.0, 110.0, 121.0];
        let movement = analyze(&values.map(Some));
        let text = commentary(&record("Revenue", &values), &movement);
        assert!(text.starts_with("Revenue:\n"));
        assert!(text.contains("Total: 331.00"));
        assert!(text.contains("Range: 100.00 to 121.00"));
        assert!(text.contains("Type: revenue"));
        assert!(text.contains("Trend: increasing"));
        assert!(text.contains("consistent growth"));
    }

    #[test]
    fn test_commentary_without_values() {
        let movement = analyze(&[]);
        let text = commentary(&record("Headcount", &[]), &movement);
        assert_eq!(text, "Headcount: No numeric data available for analysis");
    }

    #[test]
    fn test_volatility_bands() {
        let big = analyze(&[Some(100.0), Some(150.0)]);
        assert!(movement_commentary("Sales", &big).contains("Significant volatility"));
        let moderate = analyze(&[Some(100.0), Some(107.0)]);
        assert!(movement_commentary("Sales", &moderate).contains("Moderate changes"));
        let calm = analyze(&[Some(100.0), Some(98.0)]);
        let text = movement_commentary("Sales", &calm);
        assert!(text.contains("decreasing trend with average change of -2.00"));
        assert!(text.contains("Relatively stable performance"));
    }
}
