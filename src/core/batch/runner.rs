//! Folder anonymization
//!
//! Discovers input files, builds one engine per date-shift scope unit, and
//! anonymizes files concurrently on the blocking thread pool.

use super::summary::{BatchSummary, FileError, FileReport};
use crate::adapters::fhir_json;
use crate::anonymization::{AnonymizationSettings, AnonymizerEngine, EngineContext};
use crate::config::{AnonymizerConfig, DateShiftScope};
use crate::domain::context::ResultExt;
use crate::domain::{CloakError, Result};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const JSON_EXTENSION: &str = "json";
const NDJSON_EXTENSION: &str = "ndjson";

/// Options for a folder run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Folder to read from
    pub input_dir: PathBuf,
    /// Folder to write to; the input layout is mirrored
    pub output_dir: PathBuf,
    /// Read `*.ndjson` files (one resource per line) instead of `*.json`
    pub bulk: bool,
    /// Descend into sub-folders
    pub recursive: bool,
    /// Leave files whose output already exists untouched
    pub skip_existing: bool,
    /// Per-record settings
    pub settings: AnonymizationSettings,
    /// Files processed at once
    pub concurrency: usize,
}

impl BatchOptions {
    /// Options with defaults for everything but the folders
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            bulk: false,
            recursive: false,
            skip_existing: false,
            settings: AnonymizationSettings::default(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// One unit of work
struct FileJob {
    input: PathBuf,
    output: PathBuf,
    engine: Arc<AnonymizerEngine>,
}

/// Anonymizes every matching file in a folder
pub struct FolderAnonymizer {
    config: AnonymizerConfig,
    options: BatchOptions,
}

impl FolderAnonymizer {
    /// Create a new folder anonymizer
    pub fn new(config: AnonymizerConfig, options: BatchOptions) -> Self {
        Self { config, options }
    }

    /// Run over the input folder
    ///
    /// File-level failures are recorded in the summary.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an engine cannot be built, and an I/O
    /// error if the input folder cannot be listed
    pub async fn run(&self) -> Result<BatchSummary> {
        let started = Instant::now();
        let extension = if self.options.bulk {
            NDJSON_EXTENSION
        } else {
            JSON_EXTENSION
        };

        let files = discover_files(&self.options.input_dir, extension, self.options.recursive)?;
        crate::log_batch_start!(
            self.options.input_dir.display(),
            self.options.output_dir.display(),
            files.len()
        );

        let mut summary = BatchSummary::new();
        summary.files_total = files.len();

        let mut jobs = Vec::with_capacity(files.len());
        let mut engines = EngineCache::new(&self.config);
        for input in files {
            let output = self.output_path(&input)?;
            if self.options.skip_existing && output.exists() {
                tracing::debug!(file = %input.display(), "Output exists, skipping");
                summary.add_skipped_existing();
                continue;
            }
            let engine = engines.engine_for(&input)?;
            jobs.push(FileJob {
                input,
                output,
                engine,
            });
        }

        let settings = self.options.settings;
        let bulk = self.options.bulk;
        let results: Vec<(PathBuf, Result<FileReport>)> = stream::iter(jobs)
            .map(|job| async move {
                let input = job.input.clone();
                let result = tokio::task::spawn_blocking(move || process_file(&job, bulk, &settings))
                    .await
                    .unwrap_or_else(|e| {
                        Err(CloakError::Io(format!("File task panicked: {e}")))
                    });
                (input, result)
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        for (input, result) in results {
            match result {
                Ok(report) => summary.add_file(&report),
                Err(e) => {
                    crate::log_error_with_context!(&e, "Failed to anonymize file");
                    summary.add_error(FileError::new(input, e.to_string()));
                }
            }
        }

        let summary = summary.with_duration(started.elapsed());
        crate::log_batch_complete!(
            summary.records_anonymized,
            summary.records_dropped,
            summary.duration
        );
        Ok(summary)
    }

    fn output_path(&self, input: &Path) -> Result<PathBuf> {
        let relative = input.strip_prefix(&self.options.input_dir).map_err(|_| {
            CloakError::Io(format!(
                "{} is not inside {}",
                input.display(),
                self.options.input_dir.display()
            ))
        })?;
        Ok(self.options.output_dir.join(relative))
    }
}

/// Engines keyed by the scope unit they serve
struct EngineCache<'a> {
    config: &'a AnonymizerConfig,
    engines: HashMap<PathBuf, Arc<AnonymizerEngine>>,
}

impl<'a> EngineCache<'a> {
    fn new(config: &'a AnonymizerConfig) -> Self {
        Self {
            config,
            engines: HashMap::new(),
        }
    }

    fn engine_for(&mut self, input: &Path) -> Result<Arc<AnonymizerEngine>> {
        let folder = input.parent().map(Path::to_path_buf).unwrap_or_default();
        let (key, context) = match self.config.parameters.date_shift_scope {
            DateShiftScope::Resource => (PathBuf::new(), EngineContext::none()),
            DateShiftScope::Folder => (folder.clone(), EngineContext::for_folder(folder)),
            DateShiftScope::File => (
                input.to_path_buf(),
                EngineContext::new(Some(input.to_path_buf()), Some(folder)),
            ),
        };

        if let Some(engine) = self.engines.get(&key) {
            return Ok(Arc::clone(engine));
        }

        let engine = Arc::new(
            AnonymizerEngine::builder(self.config.clone())
                .context(context)
                .build()?,
        );
        self.engines.insert(key, Arc::clone(&engine));
        Ok(engine)
    }
}

/// Input files with the given extension, sorted
fn discover_files(dir: &Path, extension: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(dir, extension, recursive, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, extension: &str, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir)
        .map_err(|e| CloakError::Io(format!("Cannot read folder {}: {e}", dir.display())))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, extension, recursive, out)?;
            }
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            out.push(path);
        }
    }
    Ok(())
}

fn process_file(job: &FileJob, bulk: bool, settings: &AnonymizationSettings) -> Result<FileReport> {
    let text = fs::read_to_string(&job.input)
        .with_context(|| format!("Failed to read {}", job.input.display()))?;
    let mut report = FileReport::default();

    let output = if bulk {
        let line_settings = settings.with_pretty_output(false);
        let mut out = String::new();
        for (line_number, line) in fhir_json::ndjson_lines(&text) {
            report.records += 1;
            let anonymized = job
                .engine
                .anonymize_json(line, &line_settings)
                .with_context(|| format!("line {line_number}"))?;
            match anonymized {
                Some(record) => {
                    out.push_str(&record);
                    out.push('\n');
                    report.anonymized += 1;
                }
                None => report.dropped += 1,
            }
        }
        Some(out)
    } else {
        report.records = 1;
        let anonymized = job.engine.anonymize_json(&text, settings)?;
        if anonymized.is_some() {
            report.anonymized = 1;
        } else {
            report.dropped = 1;
        }
        anonymized
    };

    if let Some(output) = output {
        if let Some(parent) = job.output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&job.output, output)
            .with_context(|| format!("Failed to write {}", job.output.display()))?;
    }

    tracing::debug!(
        file = %job.input.display(),
        records = report.records,
        dropped = report.dropped,
        "File anonymized"
    );
    Ok(report)
}
