//! Row references inside spreadsheet formulas.

use regex::Regex;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

static CELL_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^A-Z0-9_])(\$?[A-Z]{1,3}\$?(\d+)(?::\$?[A-Z]{1,3}\$?(\d+))?)")
        .expect("valid regex")
});

static STRING_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:[^"]|"")*""#).expect("valid regex"));

pub fn is_formula(cell: &str) -> bool {
    cell.trim_start().starts_with('=')
}

/// 1-based sheet rows referenced by an A1-style formula on the same worksheet.
///
/// Ranges such as `B2:B5` contribute every row they span. Function names that look like
/// references (`LOG10(`) and references into other sheets (`Sheet2!B3`) are ignored.
/// Only rows inside `within` are returned; ranges are clipped to it before expansion.
pub fn extract_row_references(formula: &str, within: RangeInclusive<usize>) -> BTreeSet<usize> {
    let text = STRING_LITERAL_RE.replace_all(formula, "\"\"");
    let mut rows = BTreeSet::new();

    for cap in CELL_REF_RE.captures_iter(&text) {
        let Some(m) = cap.get(1) else { continue };
        if text[m.end()..].starts_with('(') || text[..m.start()].ends_with('!') {
            continue;
        }

        let Some(start) = cap.get(2).and_then(|d| d.as_str().parse::<usize>().ok()) else {
            continue;
        };
        let end = cap
            .get(3)
            .and_then(|d| d.as_str().parse::<usize>().ok())
            .unwrap_or(start);
        if start == 0 || end == 0 {
            continue;
        }

        let low = start.min(end).max(*within.start());
        let high = start.max(end).min(*within.end());
        if low <= high {
            rows.extend(low..=high);
        }
    }

    rows
}
