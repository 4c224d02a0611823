use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::classifier::{CANCELLATION_HINT, PAYEE_HINT};
use crate::error::{Result, SopError};
use crate::fmt::count;
use crate::processor::ReportProcessor;
use crate::settings::Settings;

const MAX_LISTED_COLUMNS: usize = 10;

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub(crate) fn column_list(columns: &[String]) -> String {
    let mut listed = columns
        .iter()
        .take(MAX_LISTED_COLUMNS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if columns.len() > MAX_LISTED_COLUMNS {
        listed.push_str(", ...");
    }
    listed
}

/// Print a per-file failure; an undetermined type gets the keyword hint.
pub(crate) fn print_failure(path: &Path, err: &SopError) {
    let name = display_name(path);
    match err {
        SopError::Undetermined { columns } => {
            println!("{} {name}: could not determine report type", "\u{2717}".red());
            println!("  RPT600 expects columns like: {}", PAYEE_HINT.join(", "));
            println!("  RPT908 expects columns like: {}", CANCELLATION_HINT.join(", "));
            println!("  Found: {}", column_list(columns));
        }
        other => println!("{} {name}: {other}", "\u{2717}".red()),
    }
}

pub fn run(settings: &Settings, files: &[PathBuf]) -> Result<()> {
    let processor = ReportProcessor::with_writers(settings.clone(), Vec::new());
    let mut failed = 0;
    for path in files {
        match processor.validate_file(path) {
            Ok((_, v)) => {
                println!(
                    "{} {}: {} ({}), {} records",
                    "\u{2713}".green(),
                    display_name(path),
                    v.report_type.label().bold(),
                    v.report_type.name(),
                    count(v.row_count),
                );
                println!("  Columns: {}", column_list(&v.columns));
            }
            Err(e) => {
                failed += 1;
                print_failure(path, &e);
            }
        }
    }
    if failed > 0 && failed == files.len() {
        return Err(SopError::AllFailed(failed));
    }
    Ok(())
}
