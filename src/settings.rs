use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SopError};
use crate::parser::DataFormat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default = "default_supported_formats")]
    pub supported_formats: Vec<String>,
    #[serde(default = "default_true")]
    pub enable_excel_export: bool,
    #[serde(default = "default_true")]
    pub enable_csv_export: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    #[serde(default = "default_max_upload_files")]
    pub max_upload_files: usize,
}

fn default_output_dir() -> String {
    "processed_reports".to_string()
}

fn default_max_file_size_mb() -> u64 {
    100
}

fn default_supported_formats() -> Vec<String> {
    vec!["csv".to_string(), "xlsx".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_preview_rows() -> usize {
    100
}

fn default_max_upload_files() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_file_size_mb: default_max_file_size_mb(),
            supported_formats: default_supported_formats(),
            enable_excel_export: true,
            enable_csv_export: true,
            log_level: default_log_level(),
            log_file: None,
            preview_rows: default_preview_rows(),
            max_upload_files: default_max_upload_files(),
        }
    }
}

impl Settings {
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(shellexpand_path(&self.output_dir))
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.supported_formats
            .iter()
            .any(|f| f.trim().trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// Human-readable problems with the current settings. Empty means usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_file_size_mb == 0 {
            errors.push("max_file_size_mb must be positive".to_string());
        }
        if self.max_upload_files == 0 {
            errors.push("max_upload_files must be positive".to_string());
        }
        if self.supported_formats.is_empty() {
            errors.push("supported_formats must list at least one format".to_string());
        }
        for fmt in &self.supported_formats {
            if DataFormat::from_extension(fmt).is_none() {
                errors.push(format!("unsupported format in supported_formats: {fmt}"));
            }
        }
        if tracing_subscriber::EnvFilter::try_new(&self.log_level).is_err() {
            errors.push(format!("invalid log_level: {}", self.log_level));
        }
        let out = self.output_path();
        if out.exists() && !out.is_dir() {
            errors.push(format!("output_dir is not a directory: {}", out.display()));
        }
        errors
    }

    /// Key/value pairs for display.
    pub fn summary_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("app_name", env!("CARGO_PKG_NAME").to_string()),
            ("app_version", env!("CARGO_PKG_VERSION").to_string()),
            ("output_dir", self.output_dir.clone()),
            ("max_file_size_mb", self.max_file_size_mb.to_string()),
            ("supported_formats", self.supported_formats.join(",")),
            ("enable_excel_export", self.enable_excel_export.to_string()),
            ("enable_csv_export", self.enable_csv_export.to_string()),
            ("log_level", self.log_level.clone()),
            ("log_file", self.log_file.clone().unwrap_or_else(|| "(stderr)".to_string())),
            ("preview_rows", self.preview_rows.to_string()),
            ("max_upload_files", self.max_upload_files.to_string()),
        ]
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("rptsop")
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(path).unwrap_or_default();
    serde_json::from_str(&content).unwrap_or_default()
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| SopError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}
