use regex::Regex;
use std::sync::LazyLock;

static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\d*\.?\d+").expect("valid numeric regex"));

/// Parses a spreadsheet cell into a number.
///
/// Handles currency symbols, thousands separators, percent signs and accounting-style
/// parenthesized negatives. Anything that does not yield a finite number is `None`.
///
/// - `"(21.0)"` -> `Some(-21.0)`
/// - `"$2,373"` -> `Some(2373.0)`
/// - `"4.0%"` -> `Some(4.0)`
/// - `"n/a"` -> `None`
pub fn parse_value(cell: &str) -> Option<f64> {
    let text = cell.trim();
    if text.is_empty() {
        return None;
    }

    if text.len() >= 2 && text.starts_with('(') && text.ends_with(')') {
        let inner = text[1..text.len() - 1].trim();
        // Only one level of accounting parentheses is meaningful.
        if inner.starts_with('(') || inner.ends_with(')') {
            return None;
        }
        return parse_unsigned(inner).map(|v| -v);
    }

    parse_unsigned(text)
}

fn parse_unsigned(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }

    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%'))
        .collect();
    let cleaned = cleaned.trim();

    if let Ok(value) = cleaned.parse::<f64>() {
        if value.is_finite() {
            return Some(value);
        }
    }

    NUMERIC_RE
        .find(cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

pub fn parse_values<'a>(cells: impl IntoIterator<Item = &'a str>) -> Vec<Option<f64>> {
    cells.into_iter().map(parse_value).collect()
}
