use crate::error::{Result, SheetAnalysisError};
use crate::schema::AnalyzerConfig;
use crate::table::{Cell, Dataset};
use crate::utils::{contains_any, is_upper};
use log::debug;
use regex::Regex;

/// Decides whether a label cell reads like a financial line item.
#[derive(Debug)]
pub struct MetricNameMatcher {
    keywords: Vec<String>,
    prefixes: Vec<Regex>,
}

impl MetricNameMatcher {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let prefixes = config
            .metric_prefix_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| SheetAnalysisError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            keywords: config.metric_keywords.clone(),
            prefixes,
        })
    }

    pub fn is_metric_name(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        contains_any(text, &self.keywords) || self.prefixes.iter().any(|re| re.is_match(text))
    }
}

/// Collapses row labels spread over several indented columns into column 0.
pub struct HierarchyResolver<'a> {
    names: &'a MetricNameMatcher,
    metric_column_ratio: f64,
    hierarchy_ratio: f64,
}

impl<'a> HierarchyResolver<'a> {
    pub fn new(names: &'a MetricNameMatcher, config: &AnalyzerConfig) -> Self {
        Self {
            names,
            metric_column_ratio: config.metric_column_ratio,
            hierarchy_ratio: config.hierarchy_ratio,
        }
    }

    pub fn resolve(&self, mut dataset: Dataset) -> Dataset {
        if dataset.is_empty() || dataset.columns.len() < 2 {
            return dataset;
        }

        let header_col = self.find_header_column(&dataset);
        if header_col == 0 {
            return dataset;
        }

        debug!("Row labels found in column {}; merging indented labels", header_col);
        self.merge_labels(&mut dataset, header_col);
        dataset
    }

    pub fn find_header_column(&self, dataset: &Dataset) -> usize {
        if self.metric_share(dataset, 1) >= self.metric_column_ratio {
            return 1;
        }

        let (hierarchical, total) = column_texts(dataset, 0)
            .filter(|text| !text.is_empty())
            .fold((0usize, 0usize), |(hits, total), text| {
                let marker = (is_upper(text) && text.chars().count() > 2)
                    || text.contains('&')
                    || text.to_lowercase().contains("and")
                    || self.names.is_metric_name(text);
                (hits + usize::from(marker), total + 1)
            });
        if hierarchical > 0 && hierarchical as f64 / total as f64 > self.hierarchy_ratio {
            return 0;
        }

        (0..dataset.columns.len())
            .find(|&col| self.metric_share(dataset, col) >= self.metric_column_ratio)
            .unwrap_or(0)
    }

    /// Share of a column's non-empty cells that look like metric names; 0 when it has none.
    fn metric_share(&self, dataset: &Dataset, col: usize) -> f64 {
        let (metrics, total) = column_texts(dataset, col)
            .filter(|text| !text.is_empty())
            .fold((0usize, 0usize), |(hits, total), text| {
                (hits + usize::from(self.names.is_metric_name(text)), total + 1)
            });
        if metrics == 0 {
            0.0
        } else {
            metrics as f64 / total as f64
        }
    }

    fn merge_labels(&self, dataset: &mut Dataset, header_col: usize) {
        let mut section = String::new();
        let mut parent = String::new();

        for row in &mut dataset.rows {
            let marker = row
                .cells
                .iter()
                .take(header_col)
                .map(|c| c.raw.as_str())
                .find(|raw| !raw.is_empty())
                .unwrap_or("")
                .to_string();
            let metric = row
                .cells
                .get(header_col)
                .map(|c| c.raw.clone())
                .unwrap_or_default();

            let section_text = if marker.is_empty() { &metric } else { &marker };

            let label = if is_upper(section_text) && section_text.chars().count() > 2 {
                section = section_text.clone();
                parent.clear();
                section.clone()
            } else if !marker.is_empty()
                && marker.chars().count() > 3
                && !self.names.is_metric_name(&metric)
            {
                parent = marker.clone();
                join_label(&[&section, &marker])
            } else if !metric.is_empty() {
                join_label(&[&section, &parent, &metric])
            } else {
                marker
            };

            if let Some(first) = row.cells.first_mut() {
                *first = Cell::text(&label);
            }
        }

        if dataset.columns[0].is_empty() {
            dataset.columns[0] = dataset.columns[header_col].clone();
        }
        dataset.drop_label_columns(header_col + 1);
    }
}

fn column_texts(dataset: &Dataset, col: usize) -> impl Iterator<Item = &str> {
    dataset
        .rows
        .iter()
        .filter_map(move |row| row.cells.get(col).map(|c| c.raw.as_str()))
}

fn join_label(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" - ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DatasetRow;

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, cells)| DatasetRow {
                    source_row: i + 1,
                    cells: cells
                        .iter()
                        .enumerate()
                        .map(|(j, c)| if j == 0 { Cell::text(c) } else { Cell::parsed(c) })
                        .collect(),
                })
                .collect(),
        }
    }

    fn resolve(data: Dataset) -> Dataset {
        let config = AnalyzerConfig::default();
        let names = MetricNameMatcher::new(&config).unwrap();
        HierarchyResolver::new(&names, &config).resolve(data)
    }

    #[test]
    fn test_indented_statement_is_collapsed() {
        let data = dataset(
            &["", "", "JAN 2024", "FEB 2024"],
            &[
                &["REVENUE", "", "", ""],
                &["", "Product Sales", "100", "110"],
                &["", "Service Revenue", "50", "55"],
                &["COSTS", "", "", ""],
                &["Payroll", "", "", ""],
                &["", "Salaries", "30", "31"],
            ],
        );
        let resolved = resolve(data);

        assert_eq!(resolved.columns, vec!["", "JAN 2024", "FEB 2024"]);
        let labels: Vec<&str> = resolved.rows.iter().map(|r| r.label()).collect();
        assert_eq!(
            labels,
            vec![
                "REVENUE",
                "REVENUE - Product Sales",
                "REVENUE - Service Revenue",
                "COSTS",
                "COSTS - Payroll",
                "COSTS - Payroll - Salaries",
            ]
        );
        for row in &resolved.rows {
            assert_eq!(row.cells.len(), resolved.columns.len());
        }
        assert_eq!(resolved.rows[1].values(), vec![Some(100.0), Some(110.0)]);
    }

    #[test]
    fn test_labels_in_third_column_take_markers_from_second() {
        let data = dataset(
            &["", "", "Line Item", "JAN 2024", "FEB 2024"],
            &[
                &["", "Payroll", "", "", ""],
                &["", "", "Salaries", "30", "31"],
                &["", "", "Contractor Fees", "5", "6"],
                &["", "Overheads", "", "", ""],
                &["", "", "Office Rent", "8", "8"],
            ],
        );
        let config = AnalyzerConfig::default();
        let names = MetricNameMatcher::new(&config).unwrap();
        assert_eq!(HierarchyResolver::new(&names, &config).find_header_column(&data), 2);

        let resolved = resolve(data);
        assert_eq!(resolved.columns, vec!["Line Item", "JAN 2024", "FEB 2024"]);
        let labels: Vec<&str> = resolved.rows.iter().map(|r| r.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Payroll",
                "Payroll - Salaries",
                "Payroll - Contractor Fees",
                "Overheads",
                "Overheads - Office Rent",
            ]
        );
        for row in &resolved.rows {
            assert_eq!(row.cells.len(), 3);
        }
        assert_eq!(resolved.rows[2].values(), vec![Some(5.0), Some(6.0)]);
    }

    #[test]
    fn test_flat_label_column_is_left_alone() {
        let data = dataset(
            &["Line Item", "JAN 2024", "FEB 2024"],
            &[&["Revenue", "1", "2"], &["Cost", "3", "4"]],
        );
        let resolved = resolve(data.clone());
        assert_eq!(resolved, data);
    }

    #[test]
    fn test_metric_name_detection() {
        let names = MetricNameMatcher::new(&AnalyzerConfig::default()).unwrap();
        assert!(names.is_metric_name("Gross Margin"));
        assert!(names.is_metric_name("• Hosting fees"));
        assert!(names.is_metric_name("1. Hosting"));
        assert!(!names.is_metric_name("1,250"));
        assert!(!names.is_metric_name("Salaries"));
        assert!(!names.is_metric_name(""));
    }

    #[test]
    fn test_numeric_second_column_keeps_first_column() {
        let names = MetricNameMatcher::new(&AnalyzerConfig::default()).unwrap();
        let config = AnalyzerConfig::default();
        let data = dataset(
            &["Item", "Q1 2024", "Q2 2024"],
            &[&["Total Revenue", "10", "12"], &["Net Income", "3", "4"]],
        );
        let resolver = HierarchyResolver::new(&names, &config);
        assert_eq!(resolver.find_header_column(&data), 0);
    }
}
