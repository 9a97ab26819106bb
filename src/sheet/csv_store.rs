use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use encoding_rs::WINDOWS_1252;
use tracing::{debug, warn};

use super::store::{Sheet, SheetStore, open_file, replace_file};
use crate::error::StoreError;

/// A sheet kept in a CSV file with a header row.
///
/// Fields that are not valid UTF-8 are decoded as Windows-1252 (what Excel
/// writes for "CSV" on pt-BR systems). Saving always writes UTF-8.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decode one field; the flag is set when the Windows-1252 fallback was used.
fn decode_field(bytes: &[u8]) -> (String, bool) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), false),
        Err(_) => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            (text.into_owned(), true)
        }
    }
}

fn decode_record(record: &ByteRecord, transcoded: &mut bool) -> Vec<String> {
    record
        .iter()
        .map(|bytes| {
            let (text, fallback) = decode_field(bytes);
            *transcoded |= fallback;
            text
        })
        .collect()
}

impl SheetStore for CsvStore {
    fn load(&self) -> Result<Sheet, StoreError> {
        let read_err = |source| StoreError::Read {
            path: self.path.clone(),
            source,
        };

        let file = open_file(&self.path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let mut transcoded = false;
        let headers = decode_record(reader.byte_headers().map_err(read_err)?, &mut transcoded);

        let mut records = Vec::new();
        for result in reader.byte_records() {
            let record = result.map_err(read_err)?;
            records.push(decode_record(&record, &mut transcoded));
        }

        if transcoded {
            warn!(
                path = %self.path.display(),
                "sheet is not UTF-8; read as Windows-1252, it will be saved as UTF-8"
            );
        }
        debug!(path = %self.path.display(), rows = records.len(), "sheet loaded");
        Ok(Sheet::from_records(headers, records))
    }

    fn save(&self, sheet: &Sheet) -> Result<(), StoreError> {
        let encode_err = |source| StoreError::Encode {
            path: self.path.clone(),
            source,
        };

        replace_file(&self.path, |file| {
            let mut writer = WriterBuilder::new().flexible(true).from_writer(file);
            writer.write_record(sheet.headers()).map_err(encode_err)?;
            for record in sheet.records() {
                writer.write_record(&record).map_err(encode_err)?;
            }
            writer.flush().map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
        })?;

        debug!(path = %self.path.display(), rows = sheet.len(), "sheet saved");
        Ok(())
    }
}
