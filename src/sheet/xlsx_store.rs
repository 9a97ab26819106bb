use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use tracing::debug;

use super::store::{Sheet, SheetStore, open_file, replace_file};
use crate::error::StoreError;

const DEFAULT_WORKSHEET: &str = "Sheet1";

/// A sheet kept in the first worksheet of an `.xlsx` workbook.
///
/// Only cell values are kept: formatting and any other worksheet are lost
/// on the first save. Every cell is written back as text so long phone
/// numbers keep all their digits.
#[derive(Debug, Clone)]
pub struct XlsxStore {
    path: PathBuf,
    worksheet: OnceLock<String>,
}

impl XlsxStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            worksheet: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn worksheet_name(&self) -> &str {
        self.worksheet
            .get()
            .map(String::as_str)
            .unwrap_or(DEFAULT_WORKSHEET)
    }
}

/// Cell text as the operator sees it; whole numbers lose the `.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            (*value as i64).to_string()
        }
        other => other.to_string(),
    }
}

impl SheetStore for XlsxStore {
    fn load(&self) -> Result<Sheet, StoreError> {
        let workbook_err = |source| StoreError::Workbook {
            path: self.path.clone(),
            source,
        };

        let file = open_file(&self.path)?;
        let mut workbook: Xlsx<_> = Xlsx::new(BufReader::new(file)).map_err(workbook_err)?;
        if let Some(name) = workbook.sheet_names().first() {
            let _ = self.worksheet.set(name.clone());
        }

        let Some(range) = workbook.worksheet_range_at(0) else {
            return Ok(Sheet::from_records(Vec::new(), Vec::new()));
        };
        let range = range.map_err(workbook_err)?;

        // The range starts at the first used cell; restore leading columns.
        let offset = range.start().map(|(_, col)| col as usize).unwrap_or(0);
        let mut lines = range.rows().map(|cells| {
            let mut line = vec![String::new(); offset];
            line.extend(cells.iter().map(cell_text));
            line
        });

        let headers = lines.next().unwrap_or_default();
        let records: Vec<Vec<String>> = lines
            .filter(|line| line.iter().any(|cell| !cell.trim().is_empty()))
            .collect();

        debug!(path = %self.path.display(), rows = records.len(), "workbook loaded");
        Ok(Sheet::from_records(headers, records))
    }

    fn save(&self, sheet: &Sheet) -> Result<(), StoreError> {
        let encode_err = |source| StoreError::Spreadsheet {
            path: self.path.clone(),
            source,
        };

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(self.worksheet_name())
            .map_err(encode_err)?;

        let lines = std::iter::once(sheet.headers().to_vec()).chain(sheet.records());
        for (row, line) in lines.enumerate() {
            for (col, text) in line.iter().enumerate() {
                if text.is_empty() {
                    continue;
                }
                worksheet
                    .write_string(row as u32, col as u16, text)
                    .map_err(encode_err)?;
            }
        }

        replace_file(&self.path, |file| {
            workbook.save_to_writer(file).map_err(encode_err)
        })?;

        debug!(path = %self.path.display(), rows = sheet.len(), "workbook saved");
        Ok(())
    }
}
