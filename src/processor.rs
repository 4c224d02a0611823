use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::classifier;
use crate::error::{Result, SopError};
use crate::export::{writers_for, ExportContext, ReportWriter};
use crate::models::{
    ProcessingLog, ProcessingLogEntry, ReportType, SummaryRecord, TabularDataset,
};
use crate::parser::{self, DataFormat};
use crate::settings::Settings;
use crate::summarizer::summarize;

const STATUS_COMPLETED: &str = "completed";

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub report_type: ReportType,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// Reject empty datasets, then classify. An undetermined type is an error
/// carrying the columns so the caller can explain it.
pub fn validate(dataset: &TabularDataset) -> Result<Validation> {
    if dataset.is_empty() {
        return Err(SopError::EmptyDataset);
    }
    let columns = dataset.column_names();
    match classifier::classify(&columns) {
        ReportType::Undetermined => Err(SopError::Undetermined { columns }),
        report_type => Ok(Validation {
            report_type,
            row_count: dataset.row_count(),
            columns,
        }),
    }
}

/// A parsed input file plus what we know about where it came from.
#[derive(Debug, Clone)]
pub struct LoadedReport {
    pub name: String,
    pub checksum: String,
    pub dataset: TabularDataset,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub report_type: ReportType,
    pub summary: SummaryRecord,
    pub preview: TabularDataset,
    pub saved: Vec<PathBuf>,
    pub persistence_errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Success,
    ValidationFailed,
    Failed,
}

impl BatchStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::ValidationFailed => "Validation Failed",
            Self::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub file: String,
    pub report_type: Option<ReportType>,
    pub records: usize,
    pub status: BatchStatus,
    pub message: String,
    pub result: Option<ProcessResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub successful: usize,
    pub failed: usize,
    pub total_records: usize,
}

pub fn batch_summary(outcomes: &[BatchOutcome]) -> BatchSummary {
    outcomes.iter().fold(BatchSummary::default(), |mut t, o| {
        if o.status == BatchStatus::Success {
            t.successful += 1;
        } else {
            t.failed += 1;
        }
        t.total_records += o.records;
        t
    })
}

// ---------------------------------------------------------------------------
// Processor session
// ---------------------------------------------------------------------------

/// One processing session: owns the append-only log and the persistence
/// writers. Classification and summarizing stay pure; only `execute`
/// touches the log.
pub struct ReportProcessor {
    settings: Settings,
    writers: Vec<Box<dyn ReportWriter>>,
    log: ProcessingLog,
}

impl ReportProcessor {
    pub fn new(settings: Settings) -> Self {
        let writers = writers_for(&settings, &settings.output_path());
        Self::with_writers(settings, writers)
    }

    pub fn with_writers(settings: Settings, writers: Vec<Box<dyn ReportWriter>>) -> Self {
        Self {
            settings,
            writers,
            log: ProcessingLog::new(),
        }
    }

    pub fn log(&self) -> &ProcessingLog {
        &self.log
    }

    /// Check format and size, then parse.
    pub fn load(&self, path: &Path) -> Result<LoadedReport> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        if !self.settings.is_supported(path) {
            return Err(SopError::UnsupportedFormat(name));
        }
        let format = DataFormat::from_path(path)?;

        let size = std::fs::metadata(path)?.len();
        let limit = self.settings.max_file_size_mb;
        if size > limit.saturating_mul(1024 * 1024) {
            return Err(SopError::FileTooLarge {
                size_mb: size as f64 / (1024.0 * 1024.0),
                limit_mb: limit,
            });
        }

        let bytes = std::fs::read(path)?;
        let dataset = parser::read_bytes(&bytes, format)?;
        Ok(LoadedReport {
            name,
            checksum: parser::checksum(&bytes),
            dataset,
        })
    }

    pub fn validate_file(&self, path: &Path) -> Result<(LoadedReport, Validation)> {
        let loaded = self.load(path)?;
        let validation = validate(&loaded.dataset)?;
        Ok((loaded, validation))
    }

    /// Summarize, append one log entry, then persist. A summarize failure
    /// leaves the log and the output directory untouched; a persistence
    /// failure is reported in the result but does not fail the call.
    pub fn execute(
        &mut self,
        report_type: ReportType,
        dataset: &TabularDataset,
        source: Option<&LoadedReport>,
    ) -> Result<ProcessResult> {
        let summary = summarize(dataset, report_type)?;

        let now = chrono::Local::now();
        self.log.append(ProcessingLogEntry {
            timestamp: now.to_rfc3339(),
            report_type,
            records_processed: summary.total_records(),
            status: STATUS_COMPLETED.to_string(),
            source: source.map(|s| s.name.clone()),
            checksum: source.map(|s| s.checksum.clone()),
        });
        info!(
            report_type = report_type.label(),
            records = summary.total_records(),
            "processed report"
        );

        let ctx = ExportContext {
            report_type,
            dataset,
            summary: &summary,
            log: &self.log,
            timestamp: now.naive_local(),
        };
        let mut saved = Vec::new();
        let mut persistence_errors = Vec::new();
        for writer in &self.writers {
            match writer.write(&ctx) {
                Ok(paths) => saved.extend(paths),
                Err(e) => {
                    error!(writer = writer.name(), "Error saving processed data: {e}");
                    persistence_errors.push(format!("{} export: {e}", writer.name()));
                }
            }
        }

        Ok(ProcessResult {
            report_type,
            preview: dataset.head(self.settings.preview_rows),
            summary,
            saved,
            persistence_errors,
            warnings: Vec::new(),
        })
    }

    /// Validate and process one file. A declared expected type that differs
    /// from the detected one produces a warning; the detected type wins.
    pub fn process_file(
        &mut self,
        path: &Path,
        expected: Option<ReportType>,
    ) -> Result<ProcessResult> {
        let (loaded, validation) = self.validate_file(path)?;
        let warning = mismatch_warning(expected, validation.report_type);
        let mut result = self.execute(validation.report_type, &loaded.dataset, Some(&loaded))?;
        result.warnings.extend(warning);
        Ok(result)
    }

    /// Process every file; one failure never stops the rest.
    pub fn process_batch(
        &mut self,
        paths: &[PathBuf],
        expected: Option<ReportType>,
    ) -> Result<Vec<BatchOutcome>> {
        let limit = self.settings.max_upload_files;
        if paths.len() > limit {
            return Err(SopError::BatchTooLarge {
                count: paths.len(),
                limit,
            });
        }

        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            let file = path.display().to_string();
            let (loaded, validation) = match self.validate_file(path) {
                Ok(v) => v,
                Err(e) => {
                    warn!(file = %file, "validation failed: {e}");
                    outcomes.push(BatchOutcome {
                        file,
                        report_type: None,
                        records: 0,
                        status: BatchStatus::ValidationFailed,
                        message: e.to_string(),
                        result: None,
                    });
                    continue;
                }
            };

            let warning = mismatch_warning(expected, validation.report_type);
            match self.execute(validation.report_type, &loaded.dataset, Some(&loaded)) {
                Ok(mut result) => {
                    result.warnings.extend(warning);
                    let message = result
                        .warnings
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "Processed successfully".to_string());
                    outcomes.push(BatchOutcome {
                        file,
                        report_type: Some(validation.report_type),
                        records: validation.row_count,
                        status: BatchStatus::Success,
                        message,
                        result: Some(result),
                    });
                }
                Err(e) => {
                    error!(file = %file, "processing failed: {e}");
                    outcomes.push(BatchOutcome {
                        file,
                        report_type: Some(validation.report_type),
                        records: validation.row_count,
                        status: BatchStatus::Failed,
                        message: e.to_string(),
                        result: None,
                    });
                }
            }
        }
        Ok(outcomes)
    }
}

fn mismatch_warning(expected: Option<ReportType>, detected: ReportType) -> Option<String> {
    let expected = expected?;
    if expected == detected {
        return None;
    }
    warn!(
        expected = expected.label(),
        detected = detected.label(),
        "report type mismatch"
    );
    Some(format!(
        "Type mismatch: expected {expected}, but detected {detected}"
    ))
}
