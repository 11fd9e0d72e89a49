/// Returns the cell at `col`, treating cells past the end of a short row as empty.
pub fn cell_at<S: AsRef<str>>(row: &[S], col: usize) -> &str {
    row.get(col).map(|c| c.as_ref()).unwrap_or("")
}

pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

pub fn is_blank_row<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().all(|c| is_blank(c.as_ref()))
}

/// True when the text has at least one cased character and none of them are lower-case.
pub fn is_upper(text: &str) -> bool {
    let mut has_cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

/// Case-insensitive substring match against a keyword list. Keywords are expected lower-case.
pub fn contains_any<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_ref()))
}

/// Lower-cased alphanumeric words of a label.
pub fn label_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(sum(values) / values.len() as f64)
    }
}
