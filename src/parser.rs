use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Result, SopError};
use crate::models::{CellValue, TabularDataset};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a currency-ish amount: `1,234.56`, `$50.00`, `(500.00)`.
/// Returns `None` when the text is not a number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

#[cfg(feature = "xlsx")]
pub fn excel_serial_to_datetime(serial: f64) -> Option<chrono::NaiveDateTime> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    // 0001-01-01 ..= 9999-12-31; outside that the millisecond count can
    // overflow what chrono::Duration accepts
    if !serial.is_finite() || !(-693_594.0..=2_958_466.0).contains(&serial) {
        return None;
    }
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    base.checked_add_signed(chrono::Duration::milliseconds(millis))
}

#[cfg(feature = "xlsx")]
pub fn datetime_to_excel_serial(dt: &chrono::NaiveDateTime) -> f64 {
    chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|base| (*dt - base).num_milliseconds() as f64 / 86_400_000.0)
        .unwrap_or(0.0)
}

pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Infer a typed cell from CSV text. Dates stay text; the summarizer decides
/// what parses as a date.
fn infer_cell(raw: &str) -> CellValue {
    let s = raw.trim();
    if s.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(n) = s.parse::<f64>() {
        return CellValue::Number(n);
    }
    match s.to_ascii_lowercase().as_str() {
        "true" => CellValue::Bool(true),
        "false" => CellValue::Bool(false),
        _ => CellValue::Text(raw.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    #[cfg(feature = "xlsx")]
    Xlsx,
}

impl DataFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            #[cfg(feature = "xlsx")]
            Self::Xlsx => "xlsx",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            #[cfg(feature = "xlsx")]
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| {
            SopError::UnsupportedFormat(
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string()),
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

pub fn read_bytes(bytes: &[u8], format: DataFormat) -> Result<TabularDataset> {
    let dataset = match format {
        DataFormat::Csv => parse_csv(bytes)?,
        #[cfg(feature = "xlsx")]
        DataFormat::Xlsx => parse_xlsx(bytes)?,
    };
    debug!(
        format = format.extension(),
        rows = dataset.row_count(),
        columns = dataset.columns().len(),
        "parsed dataset"
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn parse_csv<R: Read>(reader: R) -> Result<TabularDataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Ok(TabularDataset::default());
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        // blank lines only; a row of empty fields is still a row
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        records.push(record.iter().map(infer_cell).collect());
    }
    Ok(TabularDataset::from_rows(headers, records))
}

// ---------------------------------------------------------------------------
// XLSX (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn parse_xlsx(bytes: &[u8]) -> Result<TabularDataset> {
    use calamine::{Data, Reader, Xlsx};

    let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(std::io::Cursor::new(bytes))
        .map_err(|e| SopError::Spreadsheet(format!("Failed to open XLSX: {e}")))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => {
            range.map_err(|e| SopError::Spreadsheet(format!("Failed to read first sheet: {e}")))?
        }
        None => return Err(SopError::Spreadsheet("Workbook contains no sheets".to_string())),
    };

    let convert = |cell: &Data| -> CellValue {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => infer_cell(s),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
                .map(CellValue::Date)
                .unwrap_or(CellValue::Number(dt.as_f64())),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(_) => CellValue::Empty,
        }
    };

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(TabularDataset::default());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| match cell {
            Data::String(s) => s.trim().to_string(),
            Data::Float(f) => f.to_string(),
            Data::Int(i) => i.to_string(),
            Data::Bool(b) => b.to_string(),
            _ => String::new(),
        })
        .collect();

    let records: Vec<Vec<CellValue>> = rows
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|row| row.iter().map(convert).collect())
        .collect();
    Ok(TabularDataset::from_rows(headers, records))
}
