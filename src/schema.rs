use crate::error::{Result, SheetAnalysisError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PeriodTokenKind {
    #[schemars(description = "A calendar month name or abbreviation (JAN, February, Sept)")]
    Month,

    #[schemars(description = "A quarter marker such as Q1 or 'Quarter 2'")]
    Quarter,

    #[schemars(description = "A full-year marker such as 'Full Year', 'Annual' or 'FY'")]
    FullYear,

    #[schemars(description = "A four digit calendar year (19xx or 20xx)")]
    Year,
}

impl PeriodTokenKind {
    /// Month, quarter and full-year markers name a period on their own; years only qualify one.
    pub fn is_period(self) -> bool {
        !matches!(self, PeriodTokenKind::Year)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowCategory {
    Revenue,
    Expense,
    Profit,
    BalanceSheet,
    Other,
}

impl RowCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RowCategory::Revenue => "revenue",
            RowCategory::Expense => "expense",
            RowCategory::Profit => "profit",
            RowCategory::BalanceSheet => "balance_sheet",
            RowCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PeriodRule {
    #[schemars(
        description = "Regular expression matched against a header cell. If the pattern has a capture group, group 1 is taken as the token text."
    )]
    pub pattern: String,

    #[schemars(description = "What a match of this pattern denotes")]
    pub kind: PeriodTokenKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CategoryRule {
    #[schemars(description = "Lower-case substrings; the first rule with any match assigns its category")]
    pub keywords: Vec<String>,

    pub category: RowCategory,
}

/// Every tunable heuristic of the analyzer, expressed as data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct AnalyzerConfig {
    #[schemars(description = "Ordered period token rules used by header location and chart grouping")]
    pub period_rules: Vec<PeriodRule>,

    #[schemars(description = "Ordered first-match category rules applied to row labels")]
    pub category_rules: Vec<CategoryRule>,

    #[schemars(description = "Label keywords that mark a row as important when it also carries non-zero data")]
    pub important_keywords: Vec<String>,

    #[schemars(description = "Label keywords that mark a row as a summary (aggregate) row")]
    pub summary_keywords: Vec<String>,

    #[schemars(description = "Keywords that make a label cell look like a financial metric name")]
    pub metric_keywords: Vec<String>,

    #[schemars(description = "Case-sensitive prefix patterns (bullets, numbering, words) that also mark a metric name")]
    pub metric_prefix_patterns: Vec<String>,

    #[schemars(description = "Terms that relate a component to its summary when both labels contain them")]
    pub shared_terms: Vec<String>,

    #[schemars(description = "Aggregate terms expected in a summary label")]
    pub general_terms: Vec<String>,

    #[schemars(description = "Specific terms expected in a component label under a general summary")]
    pub specific_terms: Vec<String>,

    #[schemars(description = "Minimum distinct period tokens for a single-row header")]
    pub min_header_period_tokens: usize,

    #[schemars(description = "Share of non-empty cells that must be years (or periods) in a split header row")]
    pub period_cell_ratio: f64,

    #[schemars(description = "Share of a column's values that must look like metric names to make it the label column")]
    pub metric_column_ratio: f64,

    #[schemars(description = "Share of first-column values that must show hierarchy markers to keep it as the label column")]
    pub hierarchy_ratio: f64,

    #[schemars(description = "Number of rows above a summary row scanned for heuristic components")]
    pub component_window: usize,

    #[schemars(description = "Minimum number of periods in a group before it can be charted")]
    pub min_chart_periods: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            period_rules: default_period_rules(),
            category_rules: default_category_rules(),
            important_keywords: words(&[
                "revenue", "sales", "income", "profit", "margin", "cost", "expense", "gross",
                "operating", "net", "ebitda", "ebit", "cash", "flow", "assets", "liabilities",
                "equity", "debt", "capital", "marketing", "cac", "customers", "ltv", "churn",
                "arpu",
            ]),
            summary_keywords: words(&["total", "sum", "net", "gross", "operating"]),
            metric_keywords: words(&[
                "revenue", "sales", "income", "profit", "loss", "margin", "cost", "expense",
                "gross", "operating", "net", "ebitda", "ebit", "cash", "flow", "earnings",
                "assets", "liabilities", "equity", "debt", "capital", "marketing", "cac",
                "customers", "ltv", "churn", "arpu", "total", "sum", "balance", "receivable",
                "payable", "inventory", "depreciation", "amortization", "interest", "tax",
            ]),
            metric_prefix_patterns: words(&[
                r"^\s*[•\-\*]\s+",
                r"^\s*\d+\.\s+",
                r"^\s*[A-Z][a-z]+\s+",
                r"^\s*[a-z]+\s+",
            ]),
            shared_terms: words(&[
                "revenue", "sales", "expense", "cost", "income", "profit", "loss", "margin",
                "gross", "net", "operating",
            ]),
            general_terms: words(&["total", "net", "gross", "operating", "overall"]),
            specific_terms: words(&[
                "revenue", "sales", "expense", "cost", "returns", "refunds", "discounts",
                "stream",
            ]),
            min_header_period_tokens: 3,
            period_cell_ratio: 0.5,
            metric_column_ratio: 0.3,
            hierarchy_ratio: 0.2,
            component_window: 10,
            min_chart_periods: 2,
        }
    }
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_period_rules() -> Vec<PeriodRule> {
    vec![
        PeriodRule {
            pattern: r"(?i)(?:^|[^a-z])(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)(?:$|[^a-z])".to_string(),
            kind: PeriodTokenKind::Month,
        },
        PeriodRule {
            pattern: r"(?i)(?:^|[^a-z0-9])(q[1-4]|quarter\s*[1-4])(?:$|[^0-9])".to_string(),
            kind: PeriodTokenKind::Quarter,
        },
        PeriodRule {
            pattern: r"(?i)(?:^|[^a-z])(full\s*year|annual|fy)(?:$|[^a-z])".to_string(),
            kind: PeriodTokenKind::FullYear,
        },
        PeriodRule {
            pattern: r"(?:^|[^0-9])((?:19|20)[0-9]{2})(?:$|[^0-9])".to_string(),
            kind: PeriodTokenKind::Year,
        },
    ]
}

fn default_category_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule {
            keywords: words(&["revenue", "sales", "income"]),
            category: RowCategory::Revenue,
        },
        CategoryRule {
            keywords: words(&["cost", "expense", "cogs"]),
            category: RowCategory::Expense,
        },
        CategoryRule {
            keywords: words(&["profit", "margin", "ebit"]),
            category: RowCategory::Profit,
        },
        CategoryRule {
            keywords: words(&["asset", "liability", "liabilities", "equity"]),
            category: RowCategory::BalanceSheet,
        },
    ]
}

impl AnalyzerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalyzerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.period_rules.is_empty() {
            return Err(invalid("period_rules", "at least one rule is required"));
        }

        for (field, ratio) in [
            ("period_cell_ratio", self.period_cell_ratio),
            ("metric_column_ratio", self.metric_column_ratio),
            ("hierarchy_ratio", self.hierarchy_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(invalid(
                    field,
                    &format!("{} must be between 0.0 and 1.0", ratio),
                ));
            }
        }

        if self.min_header_period_tokens == 0 {
            return Err(invalid("min_header_period_tokens", "must be at least 1"));
        }
        if self.component_window == 0 {
            return Err(invalid("component_window", "must be at least 1"));
        }
        if self.min_chart_periods == 0 {
            return Err(invalid("min_chart_periods", "must be at least 1"));
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalyzerConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

fn invalid(field: &str, details: &str) -> SheetAnalysisError {
    SheetAnalysisError::InvalidConfig {
        field: field.to_string(),
        details: details.to_string(),
    }
}
