use crate::header::HeaderInfo;
use crate::source::RawGrid;
use crate::utils::{cell_at, is_blank};
use crate::values::parse_value;
use log::debug;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// One cleaned cell: the trimmed source text plus its numeric reading, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub raw: String,
    pub value: Option<f64>,
}

impl Cell {
    pub fn text(raw: &str) -> Self {
        Self {
            raw: raw.trim().to_string(),
            value: None,
        }
    }

    pub fn parsed(raw: &str) -> Self {
        Self {
            raw: raw.trim().to_string(),
            value: parse_value(raw),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    /// 0-based index of this row in the raw grid (sheet row number minus one).
    pub source_row: usize,
    /// Column 0 is the label; the rest line up with the dataset periods.
    pub cells: Vec<Cell>,
}

impl DatasetRow {
    pub fn label(&self) -> &str {
        self.cells.first().map(|c| c.raw.as_str()).unwrap_or("")
    }

    /// Numeric values aligned to the dataset periods.
    pub fn values(&self) -> Vec<Option<f64>> {
        self.values_from(1)
    }

    /// Numeric values starting at `column`; columns before it are skipped.
    pub fn values_from(&self, column: usize) -> Vec<Option<f64>> {
        self.cells.iter().skip(column).map(|c| c.value).collect()
    }

    pub fn numeric_values(&self) -> Vec<f64> {
        self.values().into_iter().flatten().collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Column titles; column 0 titles the label column.
    pub columns: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn periods(&self) -> &[String] {
        self.columns.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&DatasetRow> {
        self.rows.get(index)
    }

    /// Maps a raw-grid row index back to the dataset row that came from it.
    /// 1-based sheet rows spanned by the dataset.
    pub fn sheet_rows(&self) -> Option<RangeInclusive<usize>> {
        let first = self.rows.iter().map(|r| r.source_row).min()?;
        let last = self.rows.iter().map(|r| r.source_row).max()?;
        Some(first + 1..=last + 1)
    }

    pub fn index_of_source_row(&self, source_row: usize) -> Option<usize> {
        self.rows.iter().position(|r| r.source_row == source_row)
    }

    pub fn find_row(&self, label_fragment: &str) -> Option<usize> {
        let needle = label_fragment.to_lowercase();
        self.rows
            .iter()
            .position(|r| r.label().to_lowercase().contains(&needle))
    }

    /// Keeps column 0 and every column from `first_data_column` on.
    pub(crate) fn drop_label_columns(&mut self, first_data_column: usize) {
        let keep = |index: usize| index == 0 || index >= first_data_column;
        self.columns = std::mem::take(&mut self.columns)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep(*i))
            .map(|(_, c)| c)
            .collect();
        for row in &mut self.rows {
            row.cells = std::mem::take(&mut row.cells)
                .into_iter()
                .enumerate()
                .filter(|(i, _)| keep(*i))
                .map(|(_, c)| c)
                .collect();
        }
    }
}

/// Turns the rows under a located header into a [`Dataset`].
pub struct TableBuilder;

impl TableBuilder {
    pub fn build(grid: &RawGrid, header: &HeaderInfo) -> Dataset {
        let data_rows: Vec<(usize, &Vec<String>)> = grid
            .iter()
            .enumerate()
            .skip(header.data_start_index)
            .filter(|(_, row)| row.iter().any(|c| !is_blank(c)))
            .collect();

        let width = data_rows
            .iter()
            .map(|(_, row)| row.len())
            .chain(std::iter::once(header.header_labels.len()))
            .max()
            .unwrap_or(0);

        let kept_columns: Vec<usize> = (0..width)
            .filter(|&col| {
                !is_blank(cell_at(&header.header_labels, col))
                    || data_rows.iter().any(|(_, row)| !is_blank(cell_at(row, col)))
            })
            .collect();

        debug!(
            "Building dataset from {} data rows; keeping {} of {} columns",
            data_rows.len(),
            kept_columns.len(),
            width
        );

        let columns = kept_columns
            .iter()
            .map(|&col| cell_at(&header.header_labels, col).trim().to_string())
            .collect();

        let rows = data_rows
            .iter()
            .map(|(source_row, row)| DatasetRow {
                source_row: *source_row,
                cells: kept_columns
                    .iter()
                    .enumerate()
                    .map(|(position, &col)| {
                        let raw = cell_at(row, col);
                        if position == 0 {
                            Cell::text(raw)
                        } else {
                            Cell::parsed(raw)
                        }
                    })
                    .collect(),
            })
            .collect();

        Dataset { columns, rows }
    }
}
