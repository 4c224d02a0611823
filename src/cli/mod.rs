pub mod classify;
pub mod config;
pub mod process;
pub mod show;
pub mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};

use crate::models::{ReportType, TabularDataset};

pub(crate) fn parse_report_type(s: &str) -> Result<ReportType, String> {
    ReportType::from_label(s).ok_or_else(|| format!("unknown report type '{s}' (expected RPT600 or RPT908)"))
}

/// Render the first rows of a dataset.
pub(crate) fn preview_table(dataset: &TabularDataset) -> Table {
    let mut table = Table::new();
    table.set_header(dataset.column_names());
    for idx in 0..dataset.row_count() {
        table.add_row(
            dataset
                .row(idx)
                .into_iter()
                .map(|c| Cell::new(c.to_string()))
                .collect::<Vec<_>>(),
        );
    }
    table
}

#[derive(Parser)]
#[command(
    name = "rptsop",
    version,
    about = "Classify and summarize RPT600 payee statements and RPT908 cancellation reports."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/rptsop/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that files can be read and detect their report type.
    Validate {
        /// CSV or XLSX files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Summarize reports and save the processed output.
    Process {
        /// CSV or XLSX files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Report type the files are expected to be (RPT600 or RPT908)
        #[arg(long, value_parser = parse_report_type)]
        expect: Option<ReportType>,
        /// Directory for processed output (overrides settings)
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        /// Skip writing processed output
        #[arg(long = "no-save")]
        no_save: bool,
        /// Number of preview rows to show
        #[arg(long)]
        preview: Option<usize>,
    },
    /// Score a set of column names without reading a file.
    Classify {
        /// Column names, e.g. Payee Commission Dealer
        #[arg(required = true)]
        columns: Vec<String>,
    },
    /// Print a saved summary file.
    Show {
        /// Path to a *_summary_*.json file
        summary: PathBuf,
    },
    /// Show current settings.
    Config {
        /// Write the default settings file
        #[arg(long)]
        init: bool,
    },
}
