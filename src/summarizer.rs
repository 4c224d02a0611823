use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Result, SopError};
use crate::models::{CellValue, Column, ReportType, SummaryRecord, TabularDataset};
use crate::parser::parse_amount;

const DATE_KEYWORDS: &[&str] = &["date", "time"];
const REASON_KEYWORDS: &[&str] = &["reason", "cause"];
const PAYEE_AMOUNT_KEYWORDS: &[&str] = &["amount", "commission", "fee"];
const REFUND_AMOUNT_KEYWORDS: &[&str] = &["refund", "amount"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%d-%b-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

// ---------------------------------------------------------------------------
// Cell helpers
// ---------------------------------------------------------------------------

pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn cell_date(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::Date(dt) => Some(*dt),
        CellValue::Text(s) => parse_date(s),
        _ => None,
    }
}

fn cell_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => parse_amount(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Extractions. Each returns None when the metric cannot be computed and the
// caller picks the default.
// ---------------------------------------------------------------------------

/// Distinct non-empty values of `preferred`, or of `fallback` when `preferred`
/// is missing.
fn distinct_count(dataset: &TabularDataset, preferred: &str, fallback: &str) -> Option<usize> {
    let column = dataset
        .column(preferred)
        .or_else(|| dataset.column(fallback))?;
    let distinct: HashSet<(u8, String)> = column
        .cells
        .iter()
        .filter_map(CellValue::distinct_key)
        .collect();
    Some(distinct.len())
}

fn date_range(dataset: &TabularDataset) -> Option<String> {
    let column = dataset.find_column(DATE_KEYWORDS)?;
    let mut dates = column.cells.iter().filter_map(cell_date);
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(format!(
        "{} to {}",
        min.format("%Y-%m-%d"),
        max.format("%Y-%m-%d")
    ))
}

fn amount_sum(dataset: &TabularDataset, keywords: &[&str]) -> Option<f64> {
    let column = dataset.find_column(keywords)?;
    let total: f64 = column.cells.iter().filter_map(cell_amount).sum();
    total.is_finite().then_some(total)
}

fn frequency(column: &Column) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for cell in column.cells.iter().filter(|c| !c.is_empty()) {
        *counts.entry(cell.to_string()).or_insert(0) += 1;
    }
    counts
}

// ---------------------------------------------------------------------------
// summarize
// ---------------------------------------------------------------------------

pub fn summarize(dataset: &TabularDataset, report_type: ReportType) -> Result<SummaryRecord> {
    match report_type {
        ReportType::PayeeStatement => Ok(SummaryRecord::PayeeStatement {
            total_records: dataset.row_count(),
            unique_payees: distinct_count(dataset, "Payee", "Payee Number").unwrap_or(0),
            unique_dealers: distinct_count(dataset, "Dealer", "Dealer Number").unwrap_or(0),
            date_range: date_range(dataset),
            total_amount: amount_sum(dataset, PAYEE_AMOUNT_KEYWORDS).unwrap_or(0.0),
        }),
        ReportType::Cancellation => Ok(SummaryRecord::Cancellation {
            total_records: dataset.row_count(),
            cancellation_reasons: dataset
                .find_column(REASON_KEYWORDS)
                .map(frequency)
                .unwrap_or_default(),
            total_refund_amount: amount_sum(dataset, REFUND_AMOUNT_KEYWORDS).unwrap_or(0.0),
            date_range: date_range(dataset),
        }),
        ReportType::Undetermined => Err(SopError::UnsupportedType(report_type)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    fn dataset(headers: &[&str], rows: Vec<Vec<CellValue>>) -> TabularDataset {
        TabularDataset::from_rows(headers.iter().map(|h| h.to_string()).collect(), rows)
    }

    fn payee_sample() -> TabularDataset {
        dataset(
            &["Payee", "Dealer", "Commission", "Date"],
            vec![
                vec![text("A"), text("D1"), num(100.0), text("2024-10-01")],
                vec![text("B"), text("D2"), num(150.0), text("2024-10-02")],
            ],
        )
    }

    fn cancellation_sample() -> TabularDataset {
        dataset(
            &["Contract", "Cancellation_Reason", "Refund_Amount", "Date"],
            vec![
                vec![text("CTR001"), text("Customer Request"), num(50.0), text("2024-10-01")],
                vec![text("CTR002"), text("Non-Payment"), num(75.0), text("2024-10-02")],
                vec![text("CTR003"), text("Customer Request"), num(100.0), text("2024-10-03")],
            ],
        )
    }

    #[test]
    fn test_payee_statement_summary() {
        let record = summarize(&payee_sample(), ReportType::PayeeStatement).unwrap();
        assert_eq!(
            record,
            SummaryRecord::PayeeStatement {
                total_records: 2,
                unique_payees: 2,
                unique_dealers: 2,
                date_range: Some("2024-10-01 to 2024-10-02".to_string()),
                total_amount: 250.0,
            }
        );
    }

    #[test]
    fn test_cancellation_summary() {
        let record = summarize(&cancellation_sample(), ReportType::Cancellation).unwrap();
        let SummaryRecord::Cancellation {
            total_records,
            cancellation_reasons,
            total_refund_amount,
            date_range,
        } = record
        else {
            panic!("expected cancellation summary");
        };
        assert_eq!(total_records, 3);
        assert_eq!(cancellation_reasons.len(), 2);
        assert_eq!(cancellation_reasons["Customer Request"], 2);
        assert_eq!(cancellation_reasons["Non-Payment"], 1);
        assert_eq!(total_refund_amount, 225.0);
        assert_eq!(date_range.as_deref(), Some("2024-10-01 to 2024-10-03"));
    }

    #[test]
    fn test_undetermined_is_unsupported() {
        let err = summarize(&payee_sample(), ReportType::Undetermined).unwrap_err();
        assert!(matches!(err, SopError::UnsupportedType(ReportType::Undetermined)));
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let ds = cancellation_sample();
        let a = serde_json::to_string(&summarize(&ds, ReportType::Cancellation).unwrap()).unwrap();
        let b = serde_json::to_string(&summarize(&ds, ReportType::Cancellation).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_payee_number_fallback_only_when_payee_missing() {
        let ds = dataset(
            &["Payee", "Payee Number"],
            vec![
                vec![text("A"), text("1")],
                vec![text("A"), text("2")],
                vec![text("A"), text("3")],
            ],
        );
        assert_eq!(distinct_count(&ds, "Payee", "Payee Number"), Some(1));

        let ds = dataset(
            &["Payee Number", "Dealer Number"],
            vec![vec![num(1.0), num(9.0)], vec![num(2.0), num(9.0)], vec![CellValue::Empty, num(9.0)]],
        );
        let record = summarize(&ds, ReportType::PayeeStatement).unwrap();
        let SummaryRecord::PayeeStatement { unique_payees, unique_dealers, .. } = record else {
            panic!("expected payee summary");
        };
        assert_eq!(unique_payees, 2);
        assert_eq!(unique_dealers, 1);
    }

    #[test]
    fn test_missing_columns_degrade_to_defaults() {
        let ds = dataset(&["Commission Notes"], vec![vec![text("n/a")]]);
        let record = summarize(&ds, ReportType::PayeeStatement).unwrap();
        assert_eq!(
            record,
            SummaryRecord::PayeeStatement {
                total_records: 1,
                unique_payees: 0,
                unique_dealers: 0,
                date_range: None,
                total_amount: 0.0,
            }
        );

        let ds = dataset(&["Contract"], vec![vec![text("CTR001")]]);
        let record = summarize(&ds, ReportType::Cancellation).unwrap();
        let SummaryRecord::Cancellation { cancellation_reasons, total_refund_amount, date_range, .. } =
            record
        else {
            panic!("expected cancellation summary");
        };
        assert!(cancellation_reasons.is_empty());
        assert_eq!(total_refund_amount, 0.0);
        assert!(date_range.is_none());
    }

    #[test]
    fn test_date_range_three_days() {
        let ds = dataset(
            &["Billing_Date"],
            vec![
                vec![text("2024-10-02")],
                vec![text("2024-10-01")],
                vec![text("2024-10-03")],
            ],
        );
        assert_eq!(date_range(&ds).as_deref(), Some("2024-10-01 to 2024-10-03"));
    }

    #[test]
    fn test_date_range_skips_unparseable_cells() {
        let ds = dataset(
            &["Date"],
            vec![vec![text("garbage")], vec![text("10/05/2024")], vec![CellValue::Empty], vec![num(3.0)]],
        );
        assert_eq!(date_range(&ds).as_deref(), Some("2024-10-05 to 2024-10-05"));
    }

    #[test]
    fn test_date_range_all_unparseable_is_absent() {
        let ds = dataset(&["Timestamp"], vec![vec![text("soon")], vec![text("later")]]);
        assert_eq!(date_range(&ds), None);
    }

    #[test]
    fn test_date_range_uses_first_date_column() {
        let ds = dataset(
            &["Cancellation_Date", "Effective Time"],
            vec![vec![text("2024-01-01"), text("2030-01-01")]],
        );
        assert_eq!(date_range(&ds).as_deref(), Some("2024-01-01 to 2024-01-01"));
    }

    #[test]
    fn test_date_cells_from_spreadsheets() {
        let dt = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap().and_hms_opt(9, 30, 0).unwrap();
        let ds = dataset(&["Date"], vec![vec![CellValue::Date(dt)]]);
        assert_eq!(date_range(&ds).as_deref(), Some("2024-10-01 to 2024-10-01"));
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2024-10-01").is_some());
        assert!(parse_date("2024/10/01").is_some());
        assert!(parse_date("10/01/2024").is_some());
        assert!(parse_date("01-Oct-2024").is_some());
        assert!(parse_date("2024-10-01 13:45:00").is_some());
        assert!(parse_date("2024-10-01T13:45:00Z").is_some());
        assert!(parse_date("13/45/2024").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_amount_sum_skips_non_numeric() {
        let ds = dataset(
            &["Fee"],
            vec![vec![num(10.0)], vec![text("$1,000.50")], vec![text("waived")], vec![CellValue::Empty]],
        );
        assert_eq!(amount_sum(&ds, PAYEE_AMOUNT_KEYWORDS), Some(1010.5));
    }

    #[test]
    fn test_amount_sum_uses_first_matching_column() {
        // "Fee_Category" comes before "Commission" and holds text only
        let ds = dataset(
            &["Payee", "Fee_Category", "Commission"],
            vec![vec![text("A"), text("Commission"), num(100.0)]],
        );
        assert_eq!(amount_sum(&ds, PAYEE_AMOUNT_KEYWORDS), Some(0.0));
    }

    #[test]
    fn test_amount_sum_overflow_falls_back() {
        let ds = dataset(&["Amount"], vec![vec![num(f64::MAX)], vec![num(f64::MAX)]]);
        assert_eq!(amount_sum(&ds, REFUND_AMOUNT_KEYWORDS), None);
        let record = summarize(&ds, ReportType::Cancellation).unwrap();
        let SummaryRecord::Cancellation { total_refund_amount, .. } = record else {
            panic!("expected cancellation summary");
        };
        assert_eq!(total_refund_amount, 0.0);
    }

    #[test]
    fn test_frequency_is_case_sensitive() {
        let ds = dataset(
            &["Cause"],
            vec![vec![text("Fraud")], vec![text("fraud")], vec![text("Fraud")], vec![CellValue::Empty]],
        );
        let counts = frequency(ds.find_column(REASON_KEYWORDS).unwrap());
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["Fraud"], 2);
        assert_eq!(counts["fraud"], 1);
    }
}
