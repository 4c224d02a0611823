use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::export::load_summary;
use crate::fmt::{count, money};
use crate::models::SummaryRecord;

/// Summary metrics as a two-column table, followed by the reason
/// breakdown for cancellation reports.
pub(crate) fn summary_table(summary: &SummaryRecord) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    let range = |r: &Option<String>| r.clone().unwrap_or_else(|| "N/A".to_string());
    match summary {
        SummaryRecord::PayeeStatement {
            total_records,
            unique_payees,
            unique_dealers,
            date_range,
            total_amount,
        } => {
            table.add_row(vec![Cell::new("Total Records"), Cell::new(count(*total_records))]);
            table.add_row(vec![Cell::new("Unique Payees"), Cell::new(count(*unique_payees))]);
            table.add_row(vec![Cell::new("Unique Dealers"), Cell::new(count(*unique_dealers))]);
            table.add_row(vec![Cell::new("Date Range"), Cell::new(range(date_range))]);
            table.add_row(vec![
                Cell::new("Total Amount".bold()),
                Cell::new(money(*total_amount)),
            ]);
        }
        SummaryRecord::Cancellation {
            total_records,
            total_refund_amount,
            date_range,
            ..
        } => {
            table.add_row(vec![Cell::new("Total Records"), Cell::new(count(*total_records))]);
            table.add_row(vec![Cell::new("Date Range"), Cell::new(range(date_range))]);
            table.add_row(vec![
                Cell::new("Total Refunds".bold()),
                Cell::new(money(*total_refund_amount)),
            ]);
        }
    }
    table
}

pub(crate) fn print_summary(summary: &SummaryRecord) {
    let rt = summary.report_type();
    println!("{} Summary ({})\n{}", rt.label().bold(), rt.name(), summary_table(summary));

    if let SummaryRecord::Cancellation {
        cancellation_reasons,
        ..
    } = summary
    {
        if !cancellation_reasons.is_empty() {
            let mut reasons = Table::new();
            reasons.set_header(vec!["Reason", "Count"]);
            let mut sorted: Vec<_> = cancellation_reasons.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (reason, n) in sorted {
                reasons.add_row(vec![Cell::new(reason), Cell::new(count(*n))]);
            }
            println!("Cancellation Reasons\n{reasons}");
        }
    }
}

pub fn run(path: &Path) -> Result<()> {
    let summary = load_summary(path)?;
    print_summary(&summary);
    Ok(())
}
