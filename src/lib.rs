//! # Financial Sheet Analyzer
//!
//! Turns a loosely structured financial-statement grid (a spreadsheet tab exported as rows of
//! cell text) into a clean dataset and per-row analysis.
//!
//! ## Pipeline
//!
//! - **Header location**: finds the row (or pair of rows) naming the reporting periods
//! - **Table building**: drops blank rows and columns and parses numeric cells
//! - **Hierarchy repair**: collapses labels indented across several columns into one
//! - **Classification**: category, summary and importance flags, totals per row
//! - **Components**: which rows a summary row is built from, by formula trace or label heuristics
//! - **Trends and charts**: period-over-period movement, commentary and chart data
//!
//! Nothing in the pipeline fails on odd input. Grids without a recognisable header, cells
//! that are not numbers and rows that cannot be charted all produce empty or absent results.
//!
//! ## Example
//!
//! ```rust
//! use financial_sheet_analyzer::*;
//!
//! let grid = grid_from_rows(&[
//!     &["Line Item", "JAN 2024", "FEB 2024"],
//!     &["Revenue", "1000", "1100"],
//!     &["Cost", "600", "660"],
//!     &["Total Profit", "400", "440"],
//! ]);
//! let formulas: FormulaGrid = vec![vec![], vec![], vec![], vec![None, Some("=B2-B3".into())]];
//!
//! let analyzer = SheetAnalyzer::new(AnalyzerConfig::default()).unwrap();
//! let report = analyzer.analyze_grid(&grid, Some(&formulas));
//!
//! let profit = report.row("Total Profit").unwrap();
//! assert!(profit.record.is_summary);
//! assert_eq!(profit.component_link().unwrap().component_labels, vec!["Revenue", "Cost"]);
//! ```

pub mod chart;
pub mod classifier;
pub mod components;
pub mod error;
pub mod formula;
pub mod header;
pub mod hierarchy;
pub mod movement;
pub mod periods;
pub mod ratios;
pub mod report;
pub mod schema;
pub mod source;
pub mod table;
pub mod utils;
pub mod values;

pub use chart::{
    comparison_chart, ChartPlan, ChartPlanner, ChartSeries, ComparisonChart, ComparisonSeries,
    NamedSeries,
};
pub use classifier::{RowClassifier, RowRecord};
pub use components::{ComponentLink, ComponentResolver, ComponentStrategy, Resolution};
pub use error::{Result, SheetAnalysisError, SourceError};
pub use formula::extract_row_references;
pub use header::{HeaderInfo, HeaderLocator, HeaderStrategy};
pub use hierarchy::{HierarchyResolver, MetricNameMatcher};
pub use movement::{movement_commentary, Movement, Trend};
pub use periods::{PeriodGroup, PeriodMatcher, PeriodType};
pub use ratios::{compute_ratio, RatioFormat, RatioPoint, RatioSeries};
pub use report::{AnalysisReport, ReportMetadata, RowAnalysis};
pub use schema::*;
pub use source::{
    grid_from_rows, FormulaGrid, FormulaSource, RawGrid, SheetSource, WorksheetFormulas,
    WorksheetRef,
};
pub use table::{Cell, Dataset, DatasetRow, TableBuilder};
pub use values::{parse_value, parse_values};

use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Movement of one selected row with its narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementSummary {
    pub row_index: usize,
    pub label: String,
    pub movement: Movement,
    pub commentary: String,
}

/// Runs the whole pipeline with one compiled configuration.
///
/// Construction validates the configuration and compiles every pattern once; after that
/// no operation fails.
#[derive(Debug)]
pub struct SheetAnalyzer {
    config: AnalyzerConfig,
    matcher: PeriodMatcher,
    names: MetricNameMatcher,
}

impl SheetAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        let matcher = PeriodMatcher::new(&config.period_rules)?;
        let names = MetricNameMatcher::new(&config)?;
        Ok(Self {
            config,
            matcher,
            names,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn locate_header(&self, grid: &RawGrid) -> HeaderInfo {
        HeaderLocator::new(&self.matcher, &self.config).locate(grid)
    }

    /// Builds the dataset under `header` and repairs indented labels.
    pub fn build_dataset(&self, grid: &RawGrid, header: &HeaderInfo) -> Dataset {
        let dataset = TableBuilder::build(grid, header);
        HierarchyResolver::new(&self.names, &self.config).resolve(dataset)
    }

    pub fn classify(&self, dataset: &Dataset, row_index: usize) -> Option<RowRecord> {
        let row = dataset.row(row_index)?;
        Some(RowClassifier::new(&self.config).classify(row_index, row))
    }

    pub fn resolve_components(
        &self,
        dataset: &Dataset,
        summary_row_index: usize,
        formulas: Option<&dyn FormulaSource>,
    ) -> Resolution<ComponentLink> {
        ComponentResolver::new(&self.config).resolve(dataset, summary_row_index, formulas)
    }

    pub fn plan_chart(
        &self,
        record: &RowRecord,
        dataset: &Dataset,
        components: Option<&ComponentLink>,
    ) -> Option<ChartPlan> {
        ChartPlanner::new(&self.matcher, &self.config).plan(record, dataset, components)
    }

    /// Analyzes every row that holds at least one number, in dataset order.
    pub fn analyze_dataset(
        &self,
        dataset: &Dataset,
        formulas: Option<&dyn FormulaSource>,
    ) -> Vec<RowAnalysis> {
        let classifier = RowClassifier::new(&self.config);
        let resolver = ComponentResolver::new(&self.config);
        let planner = ChartPlanner::new(&self.matcher, &self.config);

        dataset
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| (row, classifier.classify(index, row)))
            .filter(|(_, record)| record.has_data())
            .map(|(row, record)| {
                let trend = movement::analyze(&row.values_from(record.value_column));
                let commentary = movement::commentary(&record, &trend);
                let components = record
                    .is_summary
                    .then(|| resolver.resolve(dataset, record.row_index, formulas));
                let chart = planner.plan(
                    &record,
                    dataset,
                    components.as_ref().and_then(Resolution::value),
                );

                RowAnalysis {
                    movement: (record.numeric_values.len() >= 2).then_some(trend),
                    components,
                    chart,
                    commentary,
                    record,
                }
            })
            .collect()
    }

    /// Full pipeline over an already fetched grid.
    pub fn analyze_grid(
        &self,
        grid: &RawGrid,
        formulas: Option<&dyn FormulaSource>,
    ) -> AnalysisReport {
        self.run(grid, formulas, None)
    }

    /// Fetches the worksheet from `source` and analyzes it, tracing formulas through the
    /// same source. Fails only when the grid cannot be fetched.
    pub fn analyze_worksheet<S: SheetSource + ?Sized>(
        &self,
        source: &S,
        worksheet: &WorksheetRef,
    ) -> Result<AnalysisReport> {
        let grid = source.raw_grid(worksheet)?;
        let formulas = WorksheetFormulas::new(source, worksheet);
        Ok(self.run(&grid, Some(&formulas), Some(worksheet.clone())))
    }

    fn run(
        &self,
        grid: &RawGrid,
        formulas: Option<&dyn FormulaSource>,
        worksheet: Option<WorksheetRef>,
    ) -> AnalysisReport {
        let header = self.locate_header(grid);
        let dataset = self.build_dataset(grid, &header);

        info!(
            "Analyzing {} rows over {} periods ({:?} header)",
            dataset.len(),
            dataset.periods().len(),
            header.period_type
        );

        let rows = self.analyze_dataset(&dataset, formulas);
        debug!("{} of {} rows carry numeric data", rows.len(), dataset.len());

        AnalysisReport::new(worksheet, header, rows)
    }

    /// Movement and narrative for selected rows. Rows with fewer than two numbers are skipped.
    pub fn analyze_movements(&self, dataset: &Dataset, rows: &[usize]) -> Vec<MovementSummary> {
        let classifier = RowClassifier::new(&self.config);
        rows.iter()
            .filter_map(|&index| {
                let row = dataset.row(index)?;
                let record = classifier.classify(index, row);
                if record.numeric_values.len() < 2 {
                    return None;
                }
                // Gaps are dropped, so movements bridge over missing periods.
                let values: Vec<Option<f64>> =
                    record.numeric_values.iter().copied().map(Some).collect();
                let movement = movement::analyze(&values);
                Some(MovementSummary {
                    row_index: index,
                    commentary: movement_commentary(&record.label, &movement),
                    label: record.label,
                    movement,
                })
            })
            .collect()
    }

    /// Rows whose labels carry a financial keyword and that hold non-zero data.
    pub fn important_rows(&self, dataset: &Dataset) -> Vec<usize> {
        let classifier = RowClassifier::new(&self.config);
        dataset
            .rows
            .iter()
            .enumerate()
            .filter(|(index, row)| classifier.classify(*index, row).is_important)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn comparison_chart(&self, dataset: &Dataset, rows: &[usize]) -> ComparisonChart {
        comparison_chart(dataset, rows, &RowClassifier::new(&self.config))
    }
}

/// Analyzes a grid with the default configuration.
pub fn analyze_grid(
    grid: &RawGrid,
    formulas: Option<&dyn FormulaSource>,
) -> Result<AnalysisReport> {
    Ok(SheetAnalyzer::new(AnalyzerConfig::default())?.analyze_grid(grid, formulas))
}
