//! Interfaces to the spreadsheet backend that owns the cells.
//!
//! The analyzer never fetches anything itself: callers hand it a [`RawGrid`] and, when
//! their backend can render formulas, a [`FormulaSource`]. Timeouts and credentials are
//! the caller's business.

use crate::error::SourceError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Rows of cell text. Rows may have different lengths.
pub type RawGrid = Vec<Vec<String>>;

/// Formula text per cell, aligned with the raw grid. `None` for cells without a formula.
pub type FormulaGrid = Vec<Vec<Option<String>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorksheetRef {
    pub sheet_id: String,
    pub worksheet_id: String,
}

impl WorksheetRef {
    pub fn new(sheet_id: impl Into<String>, worksheet_id: impl Into<String>) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            worksheet_id: worksheet_id.into(),
        }
    }
}

impl std::fmt::Display for WorksheetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.sheet_id, self.worksheet_id)
    }
}

/// Per-cell formula lookup for one worksheet.
pub trait FormulaSource {
    /// Formulas for the given 0-based raw-grid rows. The first returned row is `rows.start`.
    fn cell_formulas(&self, rows: Range<usize>) -> Result<FormulaGrid, SourceError>;
}

impl FormulaSource for FormulaGrid {
    fn cell_formulas(&self, rows: Range<usize>) -> Result<FormulaGrid, SourceError> {
        Ok(rows
            .map(|index| self.get(index).cloned().unwrap_or_default())
            .collect())
    }
}

/// A spreadsheet backend addressed by sheet and worksheet.
pub trait SheetSource {
    fn raw_grid(&self, worksheet: &WorksheetRef) -> Result<RawGrid, SourceError>;

    fn cell_formulas(
        &self,
        _worksheet: &WorksheetRef,
        _rows: Range<usize>,
    ) -> Result<FormulaGrid, SourceError> {
        Err(SourceError::Unsupported)
    }

    /// Formula lookup bound to one worksheet.
    fn formulas_for<'a>(&'a self, worksheet: &'a WorksheetRef) -> WorksheetFormulas<'a, Self>
    where
        Self: Sized,
    {
        WorksheetFormulas::new(self, worksheet)
    }
}

/// Binds a [`SheetSource`] to one worksheet so it can serve formulas to the resolver.
pub struct WorksheetFormulas<'a, S: SheetSource + ?Sized> {
    source: &'a S,
    worksheet: &'a WorksheetRef,
}

impl<'a, S: SheetSource + ?Sized> WorksheetFormulas<'a, S> {
    pub fn new(source: &'a S, worksheet: &'a WorksheetRef) -> Self {
        Self { source, worksheet }
    }
}

impl<S: SheetSource + ?Sized> FormulaSource for WorksheetFormulas<'_, S> {
    fn cell_formulas(&self, rows: Range<usize>) -> Result<FormulaGrid, SourceError> {
        self.source.cell_formulas(self.worksheet, rows)
    }
}

/// Builds a [`RawGrid`] from string literals.
pub fn grid_from_rows(rows: &[&[&str]]) -> RawGrid {
    rows.iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}
