use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::csv_store::CsvStore;
use super::layout::ColumnLayout;
use super::row::ContactRow;
use super::xlsx_store::XlsxStore;
use crate::error::StoreError;
use crate::interrupt;

/// In-memory copy of the sheet: the header, every raw cell, and the named
/// rows decoded from them. Cells of columns this crate does not know about
/// are written back as they were read.
#[derive(Debug, Clone)]
pub struct Sheet {
    headers: Vec<String>,
    layout: ColumnLayout,
    cells: Vec<Vec<String>>,
    rows: Vec<ContactRow>,
}

impl Sheet {
    /// Build a sheet from raw records. The header is widened to the longest
    /// record, columns missing from it are appended after that, and short
    /// records are padded with empty cells.
    pub fn from_records(mut headers: Vec<String>, mut records: Vec<Vec<String>>) -> Self {
        let widest = records.iter().map(Vec::len).max().unwrap_or(0);
        if headers.len() < widest {
            headers.resize(widest, String::new());
        }

        let layout = ColumnLayout::resolve(&mut headers);
        for record in &mut records {
            if record.len() < headers.len() {
                record.resize(headers.len(), String::new());
            }
        }
        let rows = records.iter().map(|cells| layout.read_row(cells)).collect();
        Self {
            headers,
            layout,
            cells: records,
            rows,
        }
    }

    /// A sheet with only the standard columns.
    #[cfg(test)]
    pub fn from_rows(rows: Vec<ContactRow>) -> Self {
        let mut sheet = Self::from_records(Vec::new(), Vec::new());
        for row in rows {
            let mut cells = vec![String::new(); sheet.headers.len()];
            sheet.layout.write_row(&row, &mut cells);
            sheet.cells.push(cells);
            sheet.rows.push(row);
        }
        sheet
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[ContactRow] {
        &self.rows
    }

    pub fn row_mut(&mut self, index: usize) -> &mut ContactRow {
        &mut self.rows[index]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw records with the current row values written into their columns.
    pub fn records(&self) -> Vec<Vec<String>> {
        self.cells
            .iter()
            .zip(&self.rows)
            .map(|(cells, row)| {
                let mut cells = cells.clone();
                self.layout.write_row(row, &mut cells);
                cells
            })
            .collect()
    }
}

/// Durable storage for a [`Sheet`].
pub trait SheetStore {
    fn load(&self) -> Result<Sheet, StoreError>;

    /// Replace the stored sheet. Must never leave a partially written file
    /// at the original location.
    fn save(&self, sheet: &Sheet) -> Result<(), StoreError>;
}

/// Store picked from the file extension: `.xlsx` is a workbook, anything
/// else is read as CSV.
#[derive(Debug, Clone)]
pub enum FileStore {
    Csv(CsvStore),
    Xlsx(XlsxStore),
}

impl FileStore {
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_workbook = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
        if is_workbook {
            FileStore::Xlsx(XlsxStore::new(path))
        } else {
            FileStore::Csv(CsvStore::new(path))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            FileStore::Csv(store) => store.path(),
            FileStore::Xlsx(store) => store.path(),
        }
    }
}

impl SheetStore for FileStore {
    fn load(&self) -> Result<Sheet, StoreError> {
        match self {
            FileStore::Csv(store) => store.load(),
            FileStore::Xlsx(store) => store.load(),
        }
    }

    fn save(&self, sheet: &Sheet) -> Result<(), StoreError> {
        match self {
            FileStore::Csv(store) => store.save(sheet),
            FileStore::Xlsx(store) => store.save(sheet),
        }
    }
}

/// Open `path` for reading, mapping failure to [`StoreError::Open`].
pub(super) fn open_file(path: &Path) -> Result<File, StoreError> {
    File::open(path).map_err(|source| StoreError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a new version of `path` next to it and rename it into place.
///
/// The temporary file takes the permissions of the file it replaces and is
/// deleted on drop unless it was persisted. A forced exit waits until the
/// rename is done.
pub(super) fn replace_file(
    path: &Path,
    write: impl FnOnce(&mut File) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    interrupt::without_forced_exit(|| {
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        if let Ok(existing) = fs::metadata(path) {
            if existing.is_file() {
                tmp.as_file()
                    .set_permissions(existing.permissions())
                    .map_err(write_err)?;
            }
        }
        write(tmp.as_file_mut())?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    })
}
