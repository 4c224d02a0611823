use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{Result, SopError};
use crate::fmt::count;
use crate::models::{ProcessingLog, ReportType};
use crate::processor::{batch_summary, BatchOutcome, BatchStatus, ProcessResult, ReportProcessor};
use crate::settings::Settings;

use super::preview_table;
use super::show::print_summary;
use super::validate::print_failure;

pub struct Options {
    pub expect: Option<ReportType>,
    pub output_dir: Option<String>,
    pub no_save: bool,
    pub preview: Option<usize>,
}

fn print_result(result: &ProcessResult) {
    for w in &result.warnings {
        println!("{} {w}", "!".yellow().bold());
    }
    print_summary(&result.summary);

    if result.preview.row_count() > 0 {
        println!(
            "Preview ({} rows)\n{}",
            result.preview.row_count(),
            preview_table(&result.preview)
        );
    }

    for path in &result.saved {
        println!("Saved {}", path.display());
    }
    for e in &result.persistence_errors {
        println!("{} {e}", "!".red().bold());
    }
}

fn print_batch(outcomes: &[BatchOutcome]) {
    let mut table = Table::new();
    table.set_header(vec!["File", "Type", "Records", "Status", "Message"]);
    for o in outcomes {
        let status = match o.status {
            BatchStatus::Success => o.status.label().green(),
            _ => o.status.label().red(),
        };
        table.add_row(vec![
            Cell::new(&o.file),
            Cell::new(o.report_type.map(|t| t.label()).unwrap_or("")),
            Cell::new(count(o.records)),
            Cell::new(status),
            Cell::new(&o.message),
        ]);
    }
    println!("Batch Results\n{table}");

    let totals = batch_summary(outcomes);
    println!(
        "Successful: {}  Failed: {}  Total records: {}",
        totals.successful.to_string().green(),
        totals.failed.to_string().red(),
        count(totals.total_records),
    );
}

fn print_history(log: &ProcessingLog) {
    if log.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Timestamp", "Type", "Records", "Status", "Source"]);
    for entry in log.entries() {
        table.add_row(vec![
            Cell::new(&entry.timestamp),
            Cell::new(entry.report_type.label()),
            Cell::new(count(entry.records_processed)),
            Cell::new(&entry.status),
            Cell::new(entry.source.as_deref().unwrap_or("")),
        ]);
    }
    println!("Processing History ({} entries)\n{table}", log.len());
}

pub fn run(mut settings: Settings, files: &[PathBuf], opts: Options) -> Result<()> {
    if let Some(dir) = opts.output_dir {
        settings.output_dir = dir;
    }
    if let Some(n) = opts.preview {
        settings.preview_rows = n;
    }
    let mut processor = if opts.no_save {
        ReportProcessor::with_writers(settings, Vec::new())
    } else {
        ReportProcessor::new(settings)
    };

    if let [path] = files {
        let result = processor.process_file(path, opts.expect).inspect_err(|e| print_failure(path, e))?;
        print_result(&result);
        print_history(processor.log());
        return Ok(());
    }

    let outcomes = processor.process_batch(files, opts.expect)?;
    for result in outcomes.iter().filter_map(|o| o.result.as_ref()) {
        for path in &result.saved {
            println!("Saved {}", path.display());
        }
    }
    print_batch(&outcomes);
    print_history(processor.log());
    if batch_summary(&outcomes).successful == 0 {
        return Err(SopError::AllFailed(outcomes.len()));
    }
    Ok(())
}
