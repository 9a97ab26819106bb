use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required config: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures of the sheet store. Read failures are fatal to a run; write
/// failures leave the original file untouched and are reported per row.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot open sheet {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse sheet {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot parse workbook {}: {source}", .path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    #[error("cannot write sheet {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode sheet {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot encode workbook {}: {source}", .path.display())]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}
