use crate::error::{Result, SheetAnalysisError};
use crate::table::Dataset;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioFormat {
    #[default]
    Percentage,
    Decimal,
    /// Rendered as "numerator/denominator".
    Ratio,
}

impl FromStr for RatioFormat {
    type Err = SheetAnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "percentage" | "percent" | "%" => Ok(RatioFormat::Percentage),
            "decimal" => Ok(RatioFormat::Decimal),
            "ratio" => Ok(RatioFormat::Ratio),
            other => Err(SheetAnalysisError::InvalidConfig {
                field: "ratio_format".to_string(),
                details: format!("unknown format '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioPoint {
    pub period: String,
    /// `None` when either side is missing or the denominator is zero.
    pub value: Option<f64>,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioSeries {
    pub name: String,
    pub numerator_label: String,
    pub denominator_label: String,
    pub format: RatioFormat,
    pub points: Vec<RatioPoint>,
}

/// Per-period ratio of two rows found by case-insensitive label fragment.
///
/// Returns `None` when either row is missing from the dataset.
pub fn compute_ratio(
    dataset: &Dataset,
    name: &str,
    numerator: &str,
    denominator: &str,
    format: RatioFormat,
) -> Option<RatioSeries> {
    let numerator_row = dataset.row(dataset.find_row(numerator)?)?;
    let denominator_row = dataset.row(dataset.find_row(denominator)?)?;
    let numerators = numerator_row.values();
    let denominators = denominator_row.values();

    let points = dataset
        .periods()
        .iter()
        .enumerate()
        .map(|(i, period)| {
            let n = numerators.get(i).copied().flatten();
            let d = denominators.get(i).copied().flatten().filter(|d| *d != 0.0);
            let (value, display) = match (n, d) {
                (Some(n), Some(d)) => {
                    let quotient = n / d;
                    match format {
                        RatioFormat::Percentage => {
                            (Some(quotient * 100.0), format!("{:.2}%", quotient * 100.0))
                        }
                        RatioFormat::Decimal => (Some(quotient), format!("{:.4}", quotient)),
                        RatioFormat::Ratio => (Some(quotient), format!("{}/{}", n, d)),
                    }
                }
                _ => (None, "N/A".to_string()),
            };
            RatioPoint {
                period: period.clone(),
                value,
                display,
            }
        })
        .collect();

    Some(RatioSeries {
        name: name.to_string(),
        numerator_label: numerator_row.label().to_string(),
        denominator_label: denominator_row.label().to_string(),
        format,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, DatasetRow};

    fn sample() -> Dataset {
        let row = |source_row: usize, cells: &[&str]| DatasetRow {
            source_row,
            cells: cells
                .iter()
                .enumerate()
                .map(|(i, c)| if i == 0 { Cell::text(c) } else { Cell::parsed(c) })
                .collect(),
        };
        Dataset {
            columns: vec![
                "Line Item".into(),
                "FY 2022".into(),
                "FY 2023".into(),
                "FY 2024".into(),
            ],
            rows: vec![
                row(1, &["Total Revenue", "4000", "5000", ""]),
                row(2, &["Net Income", "1000", "1500", "900"]),
                row(3, &["Headcount", "0", "12", "14"]),
            ],
        }
    }

    #[test]
    fn test_percentage_margin() {
        let series = compute_ratio(
            &sample(),
            "Net Profit Margin",
            "net income",
            "revenue",
            RatioFormat::Percentage,
        )
        .unwrap();
        assert_eq!(series.numerator_label, "Net Income");
        assert_eq!(series.points[0].value, Some(25.0));
        assert_eq!(series.points[0].display, "25.00%");
        assert_eq!(series.points[1].display, "30.00%");
        assert_eq!(series.points[2].value, None);
        assert_eq!(series.points[2].display, "N/A");
    }

    #[test]
    fn test_decimal_and_ratio_forms() {
        let data = sample();
        let decimal =
            compute_ratio(&data, "Margin", "Net Income", "Revenue", RatioFormat::Decimal).unwrap();
        assert_eq!(decimal.points[0].display, "0.2500");

        let ratio =
            compute_ratio(&data, "Margin", "Net Income", "Revenue", RatioFormat::Ratio).unwrap();
        assert_eq!(ratio.points[1].display, "1500/5000");
    }

    #[test]
    fn test_zero_denominator_is_not_available() {
        let series =
            compute_ratio(&sample(), "Per Head", "Revenue", "Headcount", RatioFormat::Decimal)
                .unwrap();
        assert_eq!(series.points[0].display, "N/A");
        assert!(series.points[1].value.is_some());
    }

    #[test]
    fn test_missing_row_yields_none() {
        assert!(compute_ratio(&sample(), "X", "EBITDA", "Revenue", RatioFormat::Ratio).is_none());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("Percentage".parse::<RatioFormat>().unwrap(), RatioFormat::Percentage);
        assert_eq!("ratio".parse::<RatioFormat>().unwrap(), RatioFormat::Ratio);
        assert!("fraction".parse::<RatioFormat>().is_err());
    }
}
