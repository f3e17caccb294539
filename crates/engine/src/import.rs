use std::path::{Path, PathBuf};

use chrono::Local;
use metaprop_core::{PropertyRecord, parse_file};
use metaprop_storage::Host;
use tracing::warn;

use crate::apply::apply;
use crate::batch::Batch;
use crate::classify::classify;
use crate::config::{ImportConfig, resolve_input};
use crate::error::EngineError;
use crate::log::ImportLog;
use crate::plan::plan;
use crate::report::ImportReport;
use crate::sync::synchronize;

const SCHEMA_PHASE: &str = "Create Shared Fields";
const APPLY_PHASE: &str = "Set Property Values";

#[derive(Debug)]
pub enum ImportOutcome {
    Succeeded(ImportReport),
    /// The operator declined to pick an input file.
    Cancelled,
    Failed(String),
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Succeeded(_))
    }

    pub fn report(&self) -> Option<&ImportReport> {
        match self {
            ImportOutcome::Succeeded(report) => Some(report),
            _ => None,
        }
    }
}

/// Picks the input file for a run. `None` cancels the run.
pub trait InputSelector {
    fn select(&mut self, default_folder: Option<&Path>) -> Option<PathBuf>;
}

/// Selector for a path known up front.
pub struct FixedInput(pub Option<PathBuf>);

impl InputSelector for FixedInput {
    fn select(&mut self, default_folder: Option<&Path>) -> Option<PathBuf> {
        let path = self.0.take()?;
        Some(resolve_input(default_folder, &path))
    }
}

pub struct Importer {
    config: ImportConfig,
}

impl Importer {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// One complete operator-driven run: select the input, import it, and
    /// append the run log. Remembers the input's folder for the next run.
    pub fn run<H: Host>(&mut self, host: &mut H, selector: &mut dyn InputSelector) -> ImportOutcome {
        let mut log = ImportLog::new();

        let outcome = match selector.select(self.config.default_folder.as_deref()) {
            None => {
                log.info("Import cancelled: no input file selected");
                ImportOutcome::Cancelled
            }
            Some(path) => {
                if let Some(folder) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    self.config.default_folder = Some(folder.to_path_buf());
                }
                match self.import_file(host, &path, &mut log) {
                    Ok(report) => ImportOutcome::Succeeded(report),
                    Err(e) => {
                        log.warn(format!("Import failed: {e}"));
                        ImportOutcome::Failed(e.to_string())
                    }
                }
            }
        };

        log.info(format!(
            "Completed at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        if let Err(e) = log.append_to(&self.config.log_file) {
            warn!(path = %self.config.log_file.display(), error = %e, "cannot write import log");
        }
        outcome
    }

    /// Parse `path` and import its records. Nothing is touched if the
    /// file cannot be parsed.
    pub fn import_file<H: Host>(
        &self,
        host: &mut H,
        path: &Path,
        log: &mut ImportLog,
    ) -> Result<ImportReport, EngineError> {
        log.info(format!("Input file: {}", path.display()));
        let (_, records) = parse_file(path)?;
        log.info(format!("{} props deserialised", records.len()));
        let mut report = self.import_records(host, records, log)?;
        report.input = Some(path.to_path_buf());
        Ok(report)
    }

    pub fn import_records<H: Host>(
        &self,
        host: &mut H,
        records: Vec<PropertyRecord>,
        log: &mut ImportLog,
    ) -> Result<ImportReport, EngineError> {
        let mut report = ImportReport {
            parsed: records.len(),
            ..Default::default()
        };

        let classified = classify(&*host, records, &self.config.model_prefix, log)?;
        report.model_properties = classified.model_properties;
        report.missing_targets = classified.missing;
        if classified.targets.is_empty() {
            log.info("Nothing to import");
            return Ok(report);
        }

        let mut batch = Batch::begin(host, &self.config.transaction_name)?;

        let planned = plan(batch.host(), classified.targets, &self.config, log)?;
        report.rejections = planned.rejections;
        report.schema_requests = planned.requests.len();

        if !planned.requests.is_empty() {
            let scratch = self.config.scratch_store.as_path();
            let synced = batch.run_phase(SCHEMA_PHASE, |host| {
                synchronize(host, scratch, &planned.requests, log)
            })?;
            report.fields_created = synced.created;
            report.binding_failures = synced.failures;
        }

        let strict = self.config.strict_values;
        let applied = batch.run_phase(APPLY_PHASE, |host| {
            apply(host, &planned.targets, strict, log)
        })?;
        batch.finalize()?;

        report.applied = applied.applied;
        report.skipped = applied.skipped;
        report.rejections.extend(applied.rejections);
        Ok(report)
    }
}
