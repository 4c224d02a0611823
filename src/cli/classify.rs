use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::classifier::score;
use crate::error::Result;
use crate::models::ReportType;

pub fn run(columns: &[String]) -> Result<()> {
    let c = score(columns);

    let mut table = Table::new();
    table.set_header(vec!["Family", "Score", "Matched"]);
    table.add_row(vec![
        Cell::new("RPT600 (payee)"),
        Cell::new(c.payee_score),
        Cell::new(c.matched_payee.join(", ")),
    ]);
    table.add_row(vec![
        Cell::new("RPT908 (cancellation)"),
        Cell::new(c.cancellation_score),
        Cell::new(c.matched_cancellation.join(", ")),
    ]);
    println!("{table}");

    let decision = match c.report_type {
        ReportType::Undetermined => "Unknown".yellow().bold(),
        rt => rt.label().green().bold(),
    };
    println!("Report type: {decision}");
    Ok(())
}
