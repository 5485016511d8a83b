//! Scan orchestration
//!
//! One scan runs strictly in sequence: collect files, concatenate, parse, aggregate, evaluate. Nothing is shared
//! between scans, so separate [Scanner]s (or one [Scanner] behind a shared reference) may run in parallel.
use crate::document::{Aggregator, NormalizedDocument, ParseError};
use crate::rules::{EvaluateError, Evaluation, Finding, RuleEngine};
use crate::sources::{LoadError, SourceOptions, Sources};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Outcome of one scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    /// Percentage of passed checks, 0 when nothing was checked
    pub score: u8,
    pub violations: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub passed: Vec<Finding>,
    pub scanned_at: DateTime<Utc>,
}

impl ScanResult {
    pub fn new(evaluation: Evaluation, scanned_at: DateTime<Utc>) -> Self {
        Self {
            score: score(evaluation.passed.len(), evaluation.total()),
            violations: evaluation.violations,
            warnings: evaluation.warnings,
            passed: evaluation.passed,
            scanned_at,
        }
    }

    pub fn total(&self) -> usize {
        self.violations.len() + self.warnings.len() + self.passed.len()
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// `floor(100 * passed / total)`, or 0 without any checks
pub fn score(passed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }

    let percentage = passed.min(total) * 100 / total;
    percentage as u8
}

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("Unable to load configuration")]
    Load(#[from] LoadError),
    #[error("Unable to parse configuration")]
    Parse(#[from] ParseError),
    #[error("Rule evaluation failed")]
    Evaluate(#[from] EvaluateError),
}

/// Scans configuration against the rule set of its [RuleEngine]
#[derive(Debug)]
pub struct Scanner<E> {
    engine: E,
    aggregator: Aggregator,
    options: SourceOptions,
}

impl<E: RuleEngine> Scanner<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            aggregator: Aggregator::default(),
            options: SourceOptions::default(),
        }
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_source_options(mut self, options: SourceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn source_options(&self) -> &SourceOptions {
        &self.options
    }

    /// Scan configuration text
    pub fn scan(&self, text: &str) -> Result<ScanResult, ScanError> {
        let document = self.aggregator.parse(text)?;
        self.evaluate(&document)
    }

    /// Evaluate an already normalized document
    pub fn evaluate(&self, document: &NormalizedDocument) -> Result<ScanResult, ScanError> {
        let raw = self.engine.evaluate(document)?;
        let result = ScanResult::new(Evaluation::from_raw(&raw), Utc::now());

        tracing::info!(
            score = result.score,
            violations = result.violations.len(),
            warnings = result.warnings.len(),
            passed = result.passed.len(),
            "scan finished"
        );

        Ok(result)
    }

    /// Scan a single file, or every matching file below a directory
    pub fn scan_path(&self, path: &Path) -> Result<ScanResult, ScanError> {
        let sources = Sources::from_path(path, &self.options)?;
        self.scan_sources(&sources)
    }

    /// Scan an explicit list of files
    pub fn scan_files<P: AsRef<Path>>(
        &self,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<ScanResult, ScanError> {
        let sources = Sources::from_files(paths)?;
        self.scan_sources(&sources)
    }

    pub fn scan_sources(&self, sources: &Sources) -> Result<ScanResult, ScanError> {
        tracing::info!(files = sources.len(), "scanning");
        self.scan(&sources.concatenated())
    }
}
