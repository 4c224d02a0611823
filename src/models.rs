use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cells and datasets
// ---------------------------------------------------------------------------

/// One parsed cell of an uploaded report.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Key used for distinct counting. Numbers and text never collide, so
    /// `1` and `"1"` count as two values.
    pub fn distinct_key(&self) -> Option<(u8, String)> {
        if self.is_empty() {
            return None;
        }
        let tag = match self {
            Self::Empty => return None,
            Self::Text(_) => 0,
            Self::Number(_) => 1,
            Self::Bool(_) => 2,
            Self::Date(_) => 3,
        };
        Some((tag, self.to_string()))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Date(dt) if dt.num_seconds_from_midnight() == 0 => {
                write!(f, "{}", dt.format("%Y-%m-%d"))
            }
            Self::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<CellValue>,
}

/// Column-oriented table produced by the parser. Every column holds the same
/// number of cells and column names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularDataset {
    columns: Vec<Column>,
    rows: usize,
}

impl TabularDataset {
    /// Build a dataset from a header row and row-major records. Blank headers
    /// become `Unnamed: <idx>`, duplicate names keep the first occurrence,
    /// short records are padded with `Empty` and long ones truncated to the
    /// header width.
    pub fn from_rows(headers: Vec<String>, records: Vec<Vec<CellValue>>) -> Self {
        let mut keep: Vec<usize> = Vec::new();
        let mut columns: Vec<Column> = Vec::new();
        for (idx, name) in headers.into_iter().enumerate() {
            let name = if name.trim().is_empty() {
                format!("Unnamed: {idx}")
            } else {
                name
            };
            if columns.iter().any(|c| c.name == name) {
                continue;
            }
            keep.push(idx);
            columns.push(Column {
                name,
                cells: Vec::with_capacity(records.len()),
            });
        }

        let rows = if columns.is_empty() { 0 } else { records.len() };
        for mut record in records {
            if columns.is_empty() {
                break;
            }
            for (col, &idx) in columns.iter_mut().zip(&keep) {
                let cell = if idx < record.len() {
                    std::mem::replace(&mut record[idx], CellValue::Empty)
                } else {
                    CellValue::Empty
                };
                col.cells.push(cell);
            }
        }

        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Exact, case-sensitive lookup.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// First column whose lower-cased name contains any of `keywords`.
    pub fn find_column(&self, keywords: &[&str]) -> Option<&Column> {
        self.columns.iter().find(|c| {
            let lower = c.name.to_lowercase();
            keywords.iter().any(|k| lower.contains(k))
        })
    }

    pub fn row(&self, idx: usize) -> Vec<&CellValue> {
        self.columns.iter().map(|c| &c.cells[idx]).collect()
    }

    /// First `n` rows, cells untouched.
    pub fn head(&self, n: usize) -> TabularDataset {
        let rows = self.rows.min(n);
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                cells: c.cells[..rows].to_vec(),
            })
            .collect();
        TabularDataset { columns, rows }
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    #[serde(rename = "RPT600")]
    PayeeStatement,
    #[serde(rename = "RPT908")]
    Cancellation,
    Undetermined,
}

impl ReportType {
    /// Legacy label shown to users and used in output file names.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PayeeStatement => "RPT600",
            Self::Cancellation => "RPT908",
            Self::Undetermined => "Unknown",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PayeeStatement => "Payee Statement",
            Self::Cancellation => "Cancellation",
            Self::Undetermined => "Undetermined",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().replace([' ', '_', '-'], "").as_str() {
            "RPT600" => Some(Self::PayeeStatement),
            "RPT908" => Some(Self::Cancellation),
            _ => None,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "report_type")]
pub enum SummaryRecord {
    #[serde(rename = "RPT600")]
    PayeeStatement {
        total_records: usize,
        unique_payees: usize,
        unique_dealers: usize,
        date_range: Option<String>,
        total_amount: f64,
    },
    #[serde(rename = "RPT908")]
    Cancellation {
        total_records: usize,
        cancellation_reasons: BTreeMap<String, usize>,
        total_refund_amount: f64,
        date_range: Option<String>,
    },
}

/// A single summary value, typed for writers that care (spreadsheets).
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Count(usize),
    Amount(f64),
    Text(String),
    Missing,
}

impl SummaryRecord {
    pub fn report_type(&self) -> ReportType {
        match self {
            Self::PayeeStatement { .. } => ReportType::PayeeStatement,
            Self::Cancellation { .. } => ReportType::Cancellation,
        }
    }

    pub fn total_records(&self) -> usize {
        match self {
            Self::PayeeStatement { total_records, .. }
            | Self::Cancellation { total_records, .. } => *total_records,
        }
    }

    /// Flat metric list in display order.
    pub fn metrics(&self) -> Vec<(&'static str, MetricValue)> {
        let range = |r: &Option<String>| {
            r.clone().map(MetricValue::Text).unwrap_or(MetricValue::Missing)
        };
        match self {
            Self::PayeeStatement {
                total_records,
                unique_payees,
                unique_dealers,
                date_range,
                total_amount,
            } => vec![
                ("total_records", MetricValue::Count(*total_records)),
                ("unique_payees", MetricValue::Count(*unique_payees)),
                ("unique_dealers", MetricValue::Count(*unique_dealers)),
                ("date_range", range(date_range)),
                ("total_amount", MetricValue::Amount(*total_amount)),
            ],
            Self::Cancellation {
                total_records,
                cancellation_reasons,
                total_refund_amount,
                date_range,
            } => vec![
                ("total_records", MetricValue::Count(*total_records)),
                (
                    "cancellation_reasons",
                    MetricValue::Text(
                        serde_json::to_string(cancellation_reasons).unwrap_or_default(),
                    ),
                ),
                ("total_refund_amount", MetricValue::Amount(*total_refund_amount)),
                ("date_range", range(date_range)),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Processing log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingLogEntry {
    pub timestamp: String,
    pub report_type: ReportType,
    pub records_processed: usize,
    pub status: String,
    pub source: Option<String>,
    pub checksum: Option<String>,
}

/// Append-only history of completed summaries for one processor session.
#[derive(Debug, Clone, Default)]
pub struct ProcessingLog {
    entries: Vec<ProcessingLogEntry>,
}

impl ProcessingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: ProcessingLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ProcessingLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
