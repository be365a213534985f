//! The cell-addressable workbook collaborator.
//!
//! The reconciliation core only ever talks to a [`CellStore`]: an ordered
//! set of `(coordinate -> value/formula)` writes against one sheet, applied
//! in memory and persisted on save. [`XlsxWorkbook`] backs the trait with
//! umya-spreadsheet over the real form templates; [`MemoryWorkbook`] backs
//! it in tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{FormFillError, Result};

/// A single cell payload: plain value or live spreadsheet formula.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Text(String),
    Number(f64),
    Formula(String),
}

/// The final cell mapping a pipeline hands to the spreadsheet writer.
/// Created once per run and not mutated after handoff.
#[derive(Debug, Clone, Default)]
pub struct FormOutput {
    /// Target sheet; empty selects the workbook's first sheet.
    pub sheet: String,
    writes: Vec<(String, CellContent)>,
}

impl FormOutput {
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            writes: Vec::new(),
        }
    }

    pub fn text(&mut self, coordinate: impl Into<String>, value: impl Into<String>) {
        self.writes
            .push((coordinate.into(), CellContent::Text(value.into())));
    }

    pub fn number(&mut self, coordinate: impl Into<String>, value: f64) {
        self.writes
            .push((coordinate.into(), CellContent::Number(value)));
    }

    pub fn formula(&mut self, coordinate: impl Into<String>, formula: impl Into<String>) {
        self.writes
            .push((coordinate.into(), CellContent::Formula(formula.into())));
    }

    pub fn writes(&self) -> &[(String, CellContent)] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Write-side seam between the pipelines and the spreadsheet file format.
pub trait CellStore {
    fn write_text(&mut self, sheet: &str, coordinate: &str, value: &str) -> Result<()>;
    fn write_number(&mut self, sheet: &str, coordinate: &str, value: f64) -> Result<()>;
    fn write_formula(&mut self, sheet: &str, coordinate: &str, formula: &str) -> Result<()>;
    fn save(&mut self, path: &Path) -> Result<()>;

    fn apply(&mut self, output: &FormOutput) -> Result<()> {
        for (coordinate, content) in output.writes() {
            match content {
                CellContent::Text(value) => self.write_text(&output.sheet, coordinate, value)?,
                CellContent::Number(value) => {
                    self.write_number(&output.sheet, coordinate, *value)?
                }
                CellContent::Formula(formula) => {
                    self.write_formula(&output.sheet, coordinate, formula)?
                }
            }
        }
        Ok(())
    }
}

/// In-memory store used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    cells: BTreeMap<(String, String), CellContent>,
    saved_to: Option<PathBuf>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sheet: &str, coordinate: &str) -> Option<&CellContent> {
        self.cells.get(&(sheet.to_string(), coordinate.to_string()))
    }

    pub fn number(&self, sheet: &str, coordinate: &str) -> Option<f64> {
        match self.get(sheet, coordinate)? {
            CellContent::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn saved_to(&self) -> Option<&Path> {
        self.saved_to.as_deref()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

impl CellStore for MemoryWorkbook {
    fn write_text(&mut self, sheet: &str, coordinate: &str, value: &str) -> Result<()> {
        self.cells.insert(
            (sheet.to_string(), coordinate.to_string()),
            CellContent::Text(value.to_string()),
        );
        Ok(())
    }

    fn write_number(&mut self, sheet: &str, coordinate: &str, value: f64) -> Result<()> {
        self.cells.insert(
            (sheet.to_string(), coordinate.to_string()),
            CellContent::Number(value),
        );
        Ok(())
    }

    fn write_formula(&mut self, sheet: &str, coordinate: &str, formula: &str) -> Result<()> {
        self.cells.insert(
            (sheet.to_string(), coordinate.to_string()),
            CellContent::Formula(formula.to_string()),
        );
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        self.saved_to = Some(path.to_path_buf());
        Ok(())
    }
}

/// umya-spreadsheet-backed store over a real xlsx template.
pub struct XlsxWorkbook {
    book: umya_spreadsheet::Spreadsheet,
}

impl XlsxWorkbook {
    /// Loads a form template. All placement happens in memory until save.
    pub fn open_template(path: &Path) -> Result<Self> {
        let book = umya_spreadsheet::reader::xlsx::read(path)
            .map_err(|e| FormFillError::Workbook(format!("failed to read {:?}: {}", path, e)))?;
        Ok(Self { book })
    }

    pub fn new_empty() -> Self {
        Self {
            book: umya_spreadsheet::new_file(),
        }
    }

    /// Resolves a sheet by name, falling back to the first sheet the way
    /// the original form templates require (their sheet names carry
    /// trailing spaces that are easy to get wrong).
    fn sheet_mut(&mut self, name: &str) -> Result<&mut umya_spreadsheet::Worksheet> {
        if !name.is_empty() && self.book.get_sheet_by_name(name).is_some() {
            return self
                .book
                .get_sheet_by_name_mut(name)
                .ok_or_else(|| FormFillError::UnknownSheet(name.to_string()));
        }
        if !name.is_empty() {
            warn!("Sheet '{}' not found, using first sheet", name);
        }
        self.book
            .get_sheet_collection_mut()
            .first_mut()
            .ok_or_else(|| FormFillError::UnknownSheet(name.to_string()))
    }
}

impl CellStore for XlsxWorkbook {
    fn write_text(&mut self, sheet: &str, coordinate: &str, value: &str) -> Result<()> {
        self.sheet_mut(sheet)?
            .get_cell_mut(coordinate)
            .set_value(value);
        Ok(())
    }

    fn write_number(&mut self, sheet: &str, coordinate: &str, value: f64) -> Result<()> {
        self.sheet_mut(sheet)?
            .get_cell_mut(coordinate)
            .set_value_number(value);
        Ok(())
    }

    fn write_formula(&mut self, sheet: &str, coordinate: &str, formula: &str) -> Result<()> {
        let formula = formula.strip_prefix('=').unwrap_or(formula);
        self.sheet_mut(sheet)?
            .get_cell_mut(coordinate)
            .set_formula(formula);
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        umya_spreadsheet::writer::xlsx::write(&self.book, path)
            .map_err(|e| FormFillError::Workbook(format!("failed to write {:?}: {}", path, e)))?;
        info!("Saved workbook: {:?}", path);
        Ok(())
    }
}

/// Merges the first sheet of each filled workbook into one combined
/// workbook, one sheet per source file. Cell values and formulas are
/// carried over; template styling stays with the opaque store.
pub fn merge_workbooks(sources: &[PathBuf], output: &Path) -> Result<()> {
    let mut combined = umya_spreadsheet::new_file();
    let _ = combined.remove_sheet_by_name("Sheet1");

    for (index, source) in sources.iter().enumerate() {
        info!("Merging workbook: {:?}", source);
        let book = umya_spreadsheet::reader::xlsx::read(source)
            .map_err(|e| FormFillError::Workbook(format!("failed to read {:?}: {}", source, e)))?;

        let sheet = book
            .get_sheet_collection()
            .first()
            .ok_or_else(|| FormFillError::Workbook(format!("{:?} has no sheets", source)))?;

        let title = {
            let trimmed = sheet.get_name().trim();
            if trimmed.is_empty() {
                format!("Sheet{}", index + 1)
            } else {
                trimmed.to_string()
            }
        };

        let target = combined
            .new_sheet(&title)
            .map_err(|e| FormFillError::Workbook(format!("cannot add sheet '{}': {}", title, e)))?;

        for cell in sheet.get_cell_collection() {
            let coordinate = format!(
                "{}{}",
                crate::cells::column_letter(*cell.get_coordinate().get_col_num()),
                cell.get_coordinate().get_row_num()
            );
            let formula = cell.get_formula();
            if !formula.is_empty() {
                target.get_cell_mut(coordinate.as_str()).set_formula(formula);
                continue;
            }
            let value = cell.get_value();
            if value.is_empty() {
                continue;
            }
            match value.parse::<f64>() {
                Ok(number) => {
                    target
                        .get_cell_mut(coordinate.as_str())
                        .set_value_number(number);
                }
                Err(_) => {
                    target
                        .get_cell_mut(coordinate.as_str())
                        .set_value(value.to_string());
                }
            }
        }
    }

    umya_spreadsheet::writer::xlsx::write(&combined, output)
        .map_err(|e| FormFillError::Workbook(format!("failed to write {:?}: {}", output, e)))?;
    info!("Combined workbook saved: {:?}", output);
    Ok(())
}
