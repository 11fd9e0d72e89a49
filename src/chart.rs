use crate::classifier::{RowClassifier, RowRecord};
use crate::components::ComponentLink;
use crate::periods::{PeriodGroup, PeriodMatcher};
use crate::schema::{AnalyzerConfig, RowCategory};
use crate::table::Dataset;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ChartSeries {
    /// The row's own values.
    Simple(Vec<f64>),
    /// One series per component row, in component link order.
    Stacked(Vec<NamedSeries>),
}

/// Data for one chart: which periods to plot and the values over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPlan {
    pub row_index: usize,
    pub title: String,
    pub period_group: PeriodGroup,
    pub periods_used: Vec<String>,
    pub series: ChartSeries,
}

impl ChartPlan {
    pub fn is_stacked(&self) -> bool {
        matches!(self.series, ChartSeries::Stacked(_))
    }
}

pub struct ChartPlanner<'a> {
    matcher: &'a PeriodMatcher,
    min_periods: usize,
}

impl<'a> ChartPlanner<'a> {
    pub fn new(matcher: &'a PeriodMatcher, config: &AnalyzerConfig) -> Self {
        Self {
            matcher,
            min_periods: config.min_chart_periods,
        }
    }

    /// Picks the highest-priority period group with enough values and plans a chart over it.
    /// Returns `None` when no group is large enough.
    pub fn plan(
        &self,
        record: &RowRecord,
        dataset: &Dataset,
        components: Option<&ComponentLink>,
    ) -> Option<ChartPlan> {
        let row = dataset.row(record.row_index)?;
        let values = row.values();
        let periods = dataset.periods();

        let mut groups: BTreeMap<PeriodGroup, Vec<usize>> = BTreeMap::new();
        for (position, period) in periods.iter().enumerate() {
            if values.get(position).copied().flatten().is_some() {
                groups
                    .entry(self.matcher.group_of(period))
                    .or_default()
                    .push(position);
            }
        }

        let (group, positions) = PeriodGroup::PRIORITY.iter().find_map(|group| {
            groups
                .get(group)
                .filter(|positions| positions.len() >= self.min_periods)
                .map(|positions| (*group, positions))
        })?;

        let periods_used = positions.iter().map(|&p| periods[p].clone()).collect();
        let stacked = components.filter(|link| record.is_summary && !link.is_empty());

        let (series, title) = match stacked {
            Some(link) => {
                let series = link
                    .components()
                    .map(|(index, label)| {
                        let component_values = dataset
                            .row(index)
                            .map(|row| row.values())
                            .unwrap_or_default();
                        NamedSeries {
                            name: label.to_string(),
                            values: positions
                                .iter()
                                .map(|&p| component_values.get(p).copied().flatten().unwrap_or(0.0))
                                .collect(),
                        }
                    })
                    .collect();
                (
                    ChartSeries::Stacked(series),
                    format!("{} - {} Breakdown", record.label, title_case(group)),
                )
            }
            None => (
                ChartSeries::Simple(positions.iter().filter_map(|&p| values[p]).collect()),
                format!("{} - {} Analysis", record.label, title_case(group)),
            ),
        };

        debug!(
            "Planned {} chart for '{}' over {} periods",
            group.as_str(),
            record.label,
            positions.len()
        );

        Some(ChartPlan {
            row_index: record.row_index,
            title,
            period_group: group,
            periods_used,
            series,
        })
    }
}

fn title_case(group: PeriodGroup) -> String {
    let name = group.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSeries {
    pub name: String,
    pub values: Vec<f64>,
    pub category: RowCategory,
}

/// Several rows side by side over every period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonChart {
    pub title: String,
    pub categories: Vec<String>,
    pub series: Vec<ComparisonSeries>,
}

/// Builds comparison data for the selected rows. Missing values plot as 0 and indices
/// outside the dataset are skipped.
pub fn comparison_chart(
    dataset: &Dataset,
    rows: &[usize],
    classifier: &RowClassifier<'_>,
) -> ComparisonChart {
    let series = rows
        .iter()
        .filter_map(|&index| dataset.row(index))
        .map(|row| ComparisonSeries {
            name: row.label().to_string(),
            values: row
                .values()
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect(),
            category: classifier.category(row.label()),
        })
        .collect();

    ComparisonChart {
        title: "Financial Performance Analysis".to_string(),
        categories: dataset.periods().to_vec(),
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ComponentStrategy;
    use crate::table::{Cell, DatasetRow};

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

    fn plan(data: &Dataset, index: usize, link: Option<&ComponentLink>) -> Option<ChartPlan> {
        let config = AnalyzerConfig::default();
        let matcher = PeriodMatcher::new(&config.period_rules).unwrap();
        let record = RowClassifier::new(&config).classify(index, &data.rows[index]);
        ChartPlanner::new(&matcher, &config).plan(&record, data, link)
    }

    #[test]
    fn test_monthly_group_wins_over_quarters() {
        let months = [
            "JAN 2024", "FEB 2024", "MAR 2024", "APR 2024", "MAY 2024", "JUN 2024", "JUL 2024",
            "AUG 2024", "SEP 2024", "OCT 2024", "NOV 2024", "DEC 2024",
        ];
        let mut columns = vec!["Line Item"];
        columns.extend(months);
        columns.extend(["Q1 2024", "Q2 2024", "Q3 2024", "Q4 2024"]);
        let values: Vec<String> = (1..=16).map(|v| v.to_string()).collect();
        let mut row = vec!["Revenue"];
        row.extend(values.iter().map(String::as_str));
        let data = dataset(&columns, &[row.as_slice()]);

        let plan = plan(&data, 0, None).unwrap();
        assert_eq!(plan.period_group, PeriodGroup::Monthly);
        assert_eq!(plan.periods_used.len(), 12);
        assert_eq!(plan.title, "Revenue - Monthly Analysis");
        match plan.series {
            ChartSeries::Simple(values) => assert_eq!(values[11], 12.0),
            other => panic!("expected simple series, got {:?}", other),
        }
    }

    #[test]
    fn test_single_period_is_not_chartable() {
        let data = dataset(&["Line Item", "JAN 2024"], &[&["Revenue", "100"]]);
        assert!(plan(&data, 0, None).is_none());
    }

    #[test]
    fn test_empty_cells_do_not_count_toward_a_group() {
        let data = dataset(
            &["Line Item", "JAN 2024", "FEB 2024", "Q1 2024", "Q2 2024"],
            &[&["Revenue", "100", "", "300", "320"]],
        );
        let plan = plan(&data, 0, None).unwrap();
        assert_eq!(plan.period_group, PeriodGroup::Quarterly);
        assert_eq!(plan.periods_used, vec!["Q1 2024", "Q2 2024"]);
    }

    #[test]
    fn test_summary_with_components_is_stacked() {
        let data = dataset(
            &["Line Item", "JAN 2024", "FEB 2024"],
            &[
                &["Revenue", "1000", "1100"],
                &["Cost", "600", ""],
                &["Total Profit", "400", "440"],
            ],
        );
        let link = ComponentLink {
            summary_row_index: 2,
            component_row_indices: vec![0, 1],
            component_labels: vec!["Revenue".into(), "Cost".into()],
            strategy: ComponentStrategy::Formula,
        };

        let plan = plan(&data, 2, Some(&link)).unwrap();
        assert!(plan.is_stacked());
        assert_eq!(plan.title, "Total Profit - Monthly Breakdown");
        assert_eq!(plan.periods_used, vec!["JAN 2024", "FEB 2024"]);
        assert_eq!(
            plan.series,
            ChartSeries::Stacked(vec![
                NamedSeries {
                    name: "Revenue".into(),
                    values: vec![1000.0, 1100.0]
                },
                NamedSeries {
                    name: "Cost".into(),
                    values: vec![600.0, 0.0]
                },
            ])
        );
    }

    #[test]
    fn test_comparison_chart_fills_gaps() {
        let config = AnalyzerConfig::default();
        let data = dataset(
            &["Line Item", "Q1 2024", "Q2 2024"],
            &[&["Revenue", "10", ""], &["Cost", "4", "5"]],
        );
        let chart = comparison_chart(&data, &[1, 0, 9], &RowClassifier::new(&config));
        assert_eq!(chart.categories, vec!["Q1 2024", "Q2 2024"]);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].name, "Cost");
        assert_eq!(chart.series[0].category, RowCategory::Expense);
        assert_eq!(chart.series[1].values, vec![10.0, 0.0]);
    }
}
