use thiserror::Error;

use crate::models::ReportType;

#[derive(Error, Debug)]
pub enum SopError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unsupported file format: {0}. Please upload CSV or Excel files.")]
    UnsupportedFormat(String),

    #[error("File is {size_mb:.1} MB, larger than the {limit_mb} MB limit")]
    FileTooLarge { size_mb: f64, limit_mb: u64 },

    #[error("File appears to be empty")]
    EmptyDataset,

    #[error("Could not determine report type (columns: {})", columns.join(", "))]
    Undetermined { columns: Vec<String> },

    #[error("Unsupported report type: {0}")]
    UnsupportedType(ReportType),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{count} files given, at most {limit} can be processed at once")]
    BatchTooLarge { count: usize, limit: usize },

    #[error("None of the {0} files could be processed")]
    AllFailed(usize),
}

pub type Result<T> = std::result::Result<T, SopError>;
