use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::info;

use crate::error::{Result, SopError};
use crate::fmt::sanitize_filename;
use crate::models::{ProcessingLog, ReportType, SummaryRecord, TabularDataset};
use crate::settings::Settings;

/// Everything a writer needs to persist one processed report.
pub struct ExportContext<'a> {
    pub report_type: ReportType,
    pub dataset: &'a TabularDataset,
    pub summary: &'a SummaryRecord,
    pub log: &'a ProcessingLog,
    pub timestamp: NaiveDateTime,
}

impl ExportContext<'_> {
    fn stamp(&self) -> String {
        self.timestamp.format("%Y%m%d_%H%M%S").to_string()
    }
}

pub trait ReportWriter {
    fn name(&self) -> &'static str;
    /// Persist the report and return the paths written.
    fn write(&self, ctx: &ExportContext<'_>) -> Result<Vec<PathBuf>>;
}

/// Writers enabled by the settings, all rooted at `output_dir`.
pub fn writers_for(settings: &Settings, output_dir: &Path) -> Vec<Box<dyn ReportWriter>> {
    let mut writers: Vec<Box<dyn ReportWriter>> = Vec::new();
    #[cfg(feature = "xlsx")]
    {
        if settings.enable_excel_export {
            writers.push(Box::new(WorkbookWriter::new(output_dir)));
        }
    }
    if settings.enable_csv_export {
        writers.push(Box::new(CsvWriter::new(output_dir)));
    }
    writers
}

/// `<dir>/<stem>.<ext>`, or `<stem>_2.<ext>` and so on when taken.
fn unique_path(dir: &Path, stem: &str, ext: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut path = dir.join(sanitize_filename(&format!("{stem}.{ext}")));
    let mut n = 2;
    while path.exists() {
        path = dir.join(sanitize_filename(&format!("{stem}_{n}.{ext}")));
        n += 1;
    }
    Ok(path)
}

// ---------------------------------------------------------------------------
// CSV + JSON
// ---------------------------------------------------------------------------

pub struct CsvWriter {
    output_dir: PathBuf,
}

impl CsvWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }
}

impl ReportWriter for CsvWriter {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn write(&self, ctx: &ExportContext<'_>) -> Result<Vec<PathBuf>> {
        let label = ctx.report_type.label();
        let stamp = ctx.stamp();

        let data_path = unique_path(&self.output_dir, &format!("{label}_{stamp}"), "csv")?;
        let mut wtr = csv::Writer::from_path(&data_path)?;
        wtr.write_record(ctx.dataset.column_names())?;
        for idx in 0..ctx.dataset.row_count() {
            wtr.write_record(ctx.dataset.row(idx).iter().map(|c| c.to_string()))?;
        }
        wtr.flush()?;

        let summary_path = save_summary(&self.output_dir, ctx.report_type, ctx.summary, &stamp)?;
        info!(data = %data_path.display(), summary = %summary_path.display(), "wrote CSV export");
        Ok(vec![data_path, summary_path])
    }
}

pub fn save_summary(
    output_dir: &Path,
    report_type: ReportType,
    summary: &SummaryRecord,
    stamp: &str,
) -> Result<PathBuf> {
    let path = unique_path(
        output_dir,
        &format!("{}_summary_{stamp}", report_type.label()),
        "json",
    )?;
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| SopError::Persistence(e.to_string()))?;
    std::fs::write(&path, format!("{json}\n"))?;
    Ok(path)
}

pub fn load_summary(path: &Path) -> Result<SummaryRecord> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| SopError::Persistence(format!("Invalid summary file {}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// XLSX workbook (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
pub struct WorkbookWriter {
    output_dir: PathBuf,
}

#[cfg(feature = "xlsx")]
impl WorkbookWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }
}

#[cfg(feature = "xlsx")]
fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> SopError {
    SopError::Persistence(e.to_string())
}

#[cfg(feature = "xlsx")]
impl ReportWriter for WorkbookWriter {
    fn name(&self) -> &'static str {
        "xlsx"
    }

    fn write(&self, ctx: &ExportContext<'_>) -> Result<Vec<PathBuf>> {
        use rust_xlsxwriter::{Format, Workbook};

        use crate::models::{CellValue, MetricValue};
        use crate::parser::datetime_to_excel_serial;

        let path = unique_path(
            &self.output_dir,
            &format!("{}_{}", ctx.report_type.label(), ctx.stamp()),
            "xlsx",
        )?;
        let header = Format::new().set_bold();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let money_format = Format::new().set_num_format("#,##0.00");

        let mut workbook = Workbook::new();

        // Raw_Data
        let sheet = workbook.add_worksheet().set_name("Raw_Data").map_err(xlsx_err)?;
        for (col, column) in ctx.dataset.columns().iter().enumerate() {
            let col = col as u16;
            sheet
                .write_string_with_format(0, col, &column.name, &header)
                .map_err(xlsx_err)?;
            for (row, cell) in column.cells.iter().enumerate() {
                let row = row as u32 + 1;
                match cell {
                    CellValue::Empty => continue,
                    CellValue::Text(s) => sheet.write_string(row, col, s),
                    CellValue::Number(n) if n.is_finite() => sheet.write_number(row, col, *n),
                    CellValue::Number(_) => continue,
                    CellValue::Bool(b) => sheet.write_boolean(row, col, *b),
                    CellValue::Date(dt) => sheet.write_number_with_format(
                        row,
                        col,
                        datetime_to_excel_serial(dt),
                        &date_format,
                    ),
                }
                .map_err(xlsx_err)?;
            }
        }

        // Summary: one header row, one value row
        let sheet = workbook.add_worksheet().set_name("Summary").map_err(xlsx_err)?;
        for (col, (name, value)) in ctx.summary.metrics().into_iter().enumerate() {
            let col = col as u16;
            sheet
                .write_string_with_format(0, col, name, &header)
                .map_err(xlsx_err)?;
            match value {
                MetricValue::Count(n) => sheet.write_number(1, col, n as f64),
                MetricValue::Amount(v) => sheet.write_number_with_format(1, col, v, &money_format),
                MetricValue::Text(s) => sheet.write_string(1, col, &s),
                MetricValue::Missing => continue,
            }
            .map_err(xlsx_err)?;
        }

        // Processing_Log
        let sheet = workbook
            .add_worksheet()
            .set_name("Processing_Log")
            .map_err(xlsx_err)?;
        let headings = [
            "timestamp",
            "report_type",
            "records_processed",
            "status",
            "source",
            "checksum",
        ];
        for (col, heading) in headings.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, *heading, &header)
                .map_err(xlsx_err)?;
        }
        for (idx, entry) in ctx.log.entries().iter().enumerate() {
            let row = idx as u32 + 1;
            sheet.write_string(row, 0, &entry.timestamp).map_err(xlsx_err)?;
            sheet
                .write_string(row, 1, entry.report_type.label())
                .map_err(xlsx_err)?;
            sheet
                .write_number(row, 2, entry.records_processed as f64)
                .map_err(xlsx_err)?;
            sheet.write_string(row, 3, &entry.status).map_err(xlsx_err)?;
            if let Some(source) = &entry.source {
                sheet.write_string(row, 4, source).map_err(xlsx_err)?;
            }
            if let Some(checksum) = &entry.checksum {
                sheet.write_string(row, 5, checksum).map_err(xlsx_err)?;
            }
        }

        workbook.save(&path).map_err(xlsx_err)?;
        info!(path = %path.display(), "wrote workbook");
        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, ProcessingLogEntry};
    use crate::summarizer::summarize;

    fn sample() -> TabularDataset {
        TabularDataset::from_rows(
            vec!["Contract".into(), "Cancellation_Reason".into(), "Refund_Amount".into()],
            vec![
                vec![
                    CellValue::Text("CTR001".into()),
                    CellValue::Text("Customer Request".into()),
                    CellValue::Number(50.0),
                ],
                vec![
                    CellValue::Text("CTR002".into()),
                    CellValue::Text("Non-Payment".into()),
                    CellValue::Number(75.0),
                ],
            ],
        )
    }

    fn log_with_one_entry() -> ProcessingLog {
        let mut log = ProcessingLog::new();
        log.append(ProcessingLogEntry {
            timestamp: "2024-10-01T12:00:00".into(),
            report_type: ReportType::Cancellation,
            records_processed: 2,
            status: "completed".into(),
            source: Some("rpt908.csv".into()),
            checksum: None,
        });
        log
    }

    fn timestamp() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_csv_writer_names_files_from_type_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let ds = sample();
        let summary = summarize(&ds, ReportType::Cancellation).unwrap();
        let log = log_with_one_entry();
        let ctx = ExportContext {
            report_type: ReportType::Cancellation,
            dataset: &ds,
            summary: &summary,
            log: &log,
            timestamp: timestamp(),
        };
        let paths = CsvWriter::new(dir.path()).write(&ctx).unwrap();
        assert_eq!(paths[0].file_name().unwrap(), "RPT908_20241001_120000.csv");
        assert_eq!(paths[1].file_name().unwrap(), "RPT908_summary_20241001_120000.json");

        let raw = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(raw.starts_with("Contract,Cancellation_Reason,Refund_Amount\n"));
        assert!(raw.contains("CTR002,Non-Payment,75"));

        assert_eq!(load_summary(&paths[1]).unwrap(), summary);
    }

    #[test]
    fn test_second_write_in_same_second_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let ds = sample();
        let summary = summarize(&ds, ReportType::Cancellation).unwrap();
        let log = log_with_one_entry();
        let ctx = ExportContext {
            report_type: ReportType::Cancellation,
            dataset: &ds,
            summary: &summary,
            log: &log,
            timestamp: timestamp(),
        };
        let writer = CsvWriter::new(dir.path());
        writer.write(&ctx).unwrap();
        let second = writer.write(&ctx).unwrap();
        assert_eq!(second[0].file_name().unwrap(), "RPT908_20241001_120000_2.csv");
    }

    #[test]
    fn test_load_summary_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(load_summary(&path), Err(SopError::Persistence(_))));
    }

    #[test]
    fn test_writers_follow_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            enable_excel_export: false,
            enable_csv_export: true,
            ..Settings::default()
        };
        let names: Vec<_> = writers_for(&settings, dir.path()).iter().map(|w| w.name()).collect();
        assert_eq!(names, vec!["csv"]);
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_workbook_has_three_sheets() {
        use calamine::Reader;

        let dir = tempfile::tempdir().unwrap();
        let ds = sample();
        let summary = summarize(&ds, ReportType::Cancellation).unwrap();
        let log = log_with_one_entry();
        let ctx = ExportContext {
            report_type: ReportType::Cancellation,
            dataset: &ds,
            summary: &summary,
            log: &log,
            timestamp: timestamp(),
        };
        let paths = WorkbookWriter::new(dir.path()).write(&ctx).unwrap();
        assert_eq!(paths[0].file_name().unwrap(), "RPT908_20241001_120000.xlsx");

        let mut wb = calamine::open_workbook_auto(&paths[0]).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Raw_Data", "Summary", "Processing_Log"]);
        let raw = wb.worksheet_range("Raw_Data").unwrap();
        assert_eq!(raw.get_size(), (3, 3));
        let log_sheet = wb.worksheet_range("Processing_Log").unwrap();
        assert_eq!(log_sheet.get_size().0, 2);
    }
}
