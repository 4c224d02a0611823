use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::settings::{save_settings, Settings};

pub fn run(settings: &Settings, path: &Path, init: bool) -> Result<()> {
    if init {
        if path.exists() {
            println!("Settings already exist at {}", path.display());
        } else {
            save_settings(&Settings::default(), path)?;
            println!("Wrote default settings to {}", path.display());
            return Ok(());
        }
    }

    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    for (key, value) in settings.summary_pairs() {
        table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    println!("Settings ({})\n{table}", path.display());

    let problems = settings.validate();
    if problems.is_empty() {
        println!("{}", "Settings OK".green());
    } else {
        for p in problems {
            println!("{} {p}", "!".yellow().bold());
        }
    }
    Ok(())
}
