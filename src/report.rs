use crate::chart::{ChartPlan, ChartSeries};
use crate::classifier::RowRecord;
use crate::components::{ComponentLink, Resolution};
use crate::header::HeaderInfo;
use crate::movement::Movement;
use crate::source::WorksheetRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything derived for one data row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowAnalysis {
    pub record: RowRecord,
    /// Present when the row has at least two numeric values.
    pub movement: Option<Movement>,
    /// Present for summary rows.
    pub components: Option<Resolution<ComponentLink>>,
    pub chart: Option<ChartPlan>,
    pub commentary: String,
}

impl RowAnalysis {
    pub fn component_link(&self) -> Option<&ComponentLink> {
        self.components.as_ref().and_then(Resolution::value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub worksheet: Option<WorksheetRef>,
    pub analysis_date: DateTime<Utc>,
    pub header: HeaderInfo,
    pub rows_analyzed: usize,
    pub charts_planned: usize,
    pub summary_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub rows: Vec<RowAnalysis>,
}

impl AnalysisReport {
    pub fn new(
        worksheet: Option<WorksheetRef>,
        header: HeaderInfo,
        rows: Vec<RowAnalysis>,
    ) -> Self {
        let metadata = ReportMetadata {
            worksheet,
            analysis_date: Utc::now(),
            header,
            rows_analyzed: rows.len(),
            charts_planned: rows.iter().filter(|r| r.chart.is_some()).count(),
            summary_rows: rows.iter().filter(|r| r.record.is_summary).count(),
        };
        Self { metadata, rows }
    }

    pub fn row(&self, label: &str) -> Option<&RowAnalysis> {
        self.rows.iter().find(|r| r.record.label == label)
    }

    pub fn charts(&self) -> impl Iterator<Item = &ChartPlan> {
        self.rows.iter().filter_map(|r| r.chart.as_ref())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Row,Label,Category,Is Summary,Total,Average,Trend,Components,Chart\n");

        for row in &self.rows {
            let record = &row.record;
            let components = row
                .component_link()
                .map(|link| link.component_labels.join("; "))
                .unwrap_or_default();
            output.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                record.row_index,
                csv_field(&record.label),
                record.category.as_str(),
                record.is_summary,
                record.total,
                record.average.map(|a| a.to_string()).unwrap_or_default(),
                row.movement
                    .as_ref()
                    .map(|m| m.trend.as_str())
                    .unwrap_or(""),
                csv_field(&components),
                row.chart
                    .as_ref()
                    .map(|c| csv_field(&c.title))
                    .unwrap_or_default(),
            ));
        }

        output
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        let meta = &self.metadata;

        match &meta.worksheet {
            Some(worksheet) => output.push_str(&format!("# Analysis of {}\n\n", worksheet)),
            None => output.push_str("# Sheet Analysis\n\n"),
        }
        output.push_str(&format!(
            "**Generated:** {}\n\n",
            meta.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        output.push_str("## Summary\n\n");
        output.push_str(&format!("- Period type: {:?}\n", meta.header.period_type));
        if let Some(year) = &meta.header.year {
            output.push_str(&format!("- Year: {}\n", year));
        }
        output.push_str(&format!("- Periods: {}\n", meta.header.periods.len()));
        output.push_str(&format!("- Rows analyzed: {}\n", meta.rows_analyzed));
        output.push_str(&format!("- Summary rows: {}\n", meta.summary_rows));
        output.push_str(&format!("- Charts planned: {}\n\n", meta.charts_planned));

        output.push_str("## Rows\n\n");
        for row in &self.rows {
            output.push_str(&format!("### {}\n\n", row.record.label));
            output.push_str("```\n");
            output.push_str(row.commentary.trim_end());
            output.push_str("\n```\n\n");

            if let Some(link) = row.component_link() {
                output.push_str("Components:\n");
                for label in &link.component_labels {
                    output.push_str(&format!("- {}\n", label));
                }
                output.push('\n');
            }

            if let Some(chart) = &row.chart {
                let kind = match chart.series {
                    ChartSeries::Simple(_) => "bar",
                    ChartSeries::Stacked(_) => "stacked bar",
                };
                output.push_str(&format!(
                    "Chart: {} ({}, {})\n\n",
                    chart.title,
                    kind,
                    chart.periods_used.join(", ")
                ));
            }
        }

        output
    }
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::NamedSeries;
    use crate::components::ComponentStrategy;
    use crate::header::HeaderStrategy;
    use crate::movement::analyze;
    use crate::periods::{PeriodGroup, PeriodType};
    use crate::schema::RowCategory;

    fn header() -> HeaderInfo {
        HeaderInfo {
            header_row_index: 0,
            header_labels: vec!["Line Item".into(), "JAN 2024".into(), "FEB 2024".into()],
            periods: vec!["JAN 2024".into(), "FEB 2024".into()],
            period_type: PeriodType::Monthly,
            year: Some("2024".into()),
            data_start_index: 1,
            strategy: HeaderStrategy::SingleRow,
        }
    }

    fn row(index: usize, label: &str, values: &[f64], summary: bool) -> RowAnalysis {
        let record = RowRecord {
            row_index: index,
            label: label.to_string(),
            category: RowCategory::Revenue,
            is_important: true,
            is_summary: summary,
            numeric_values: values.to_vec(),
            total: values.iter().sum(),
            average: Some(values.iter().sum::<f64>() / values.len() as f64),
            value_column: 1,
        };
        RowAnalysis {
            movement: Some(analyze(&values.iter().map(|v| Some(*v)).collect::<Vec<_>>())),
            components: None,
            chart: None,
            commentary: format!("{}:\n  Total: {}", label, record.total),
            record,
        }
    }

    fn sample() -> AnalysisReport {
        let revenue = row(0, "Revenue, net of refunds", &[1000.0, 1100.0], false);
        let mut total = row(1, "Total Revenue", &[1000.0, 1100.0], true);
        total.components = Some(Resolution::Found(ComponentLink {
            summary_row_index: 1,
            component_row_indices: vec![0],
            component_labels: vec!["Revenue, net of refunds".into()],
            strategy: ComponentStrategy::Heuristic,
        }));
        total.chart = Some(ChartPlan {
            row_index: 1,
            title: "Total Revenue - Monthly Breakdown".into(),
            period_group: PeriodGroup::Monthly,
            periods_used: vec!["JAN 2024".into(), "FEB 2024".into()],
            series: ChartSeries::Stacked(vec![NamedSeries {
                name: "Revenue, net of refunds".into(),
                values: vec![1000.0, 1100.0],
            }]),
        });
        AnalysisReport::new(
            Some(WorksheetRef::new("Budget", "P&L")),
            header(),
            vec![revenue, total],
        )
    }

    #[test]
    fn test_metadata_counts() {
        let report = sample();
        assert_eq!(report.metadata.rows_analyzed, 2);
        assert_eq!(report.metadata.summary_rows, 1);
        assert_eq!(report.metadata.charts_planned, 1);
        assert_eq!(report.charts().count(), 1);
        assert!(report.row("Total Revenue").unwrap().component_link().is_some());
    }

    #[test]
    fn test_report_to_json() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["rows_analyzed"], 2);
        assert_eq!(value["rows"][1]["components"]["status"], "found");
        assert_eq!(value["rows"][1]["chart"]["series"]["kind"], "stacked");
        assert_eq!(value["rows"][0]["record"]["category"], "revenue");
    }

    #[test]
    fn test_report_to_csv_quotes_labels() {
        let csv = sample().to_csv();
        assert!(csv.starts_with("Row,Label,Category"));
        assert!(csv.contains("0,\"Revenue, net of refunds\",revenue,false,2100"));
        assert!(csv.contains("Total Revenue - Monthly Breakdown"));
    }

    #[test]
    fn test_report_to_markdown() {
        let markdown = sample().to_markdown();
        assert!(markdown.contains("# Analysis of Budget / P&L"));
        assert!(markdown.contains("- Year: 2024"));
        assert!(markdown.contains("### Total Revenue"));
        assert!(markdown.contains("Components:\n- Revenue, net of refunds"));
        assert!(markdown.contains("stacked bar, JAN 2024, FEB 2024"));
    }
}
