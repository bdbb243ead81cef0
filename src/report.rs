//! Run report: which charts were written and what went wrong along the way.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// A chart was skipped on purpose (not enough input)
    Notice,
    Warning,
    /// A chart could not be produced
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    /// What the diagnostic is about (a file, a bucket, a group)
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub pipeline: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub charts: Vec<PathBuf>,
    pub points_plotted: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            started_at: Utc::now(),
            finished_at: None,
            charts: Vec::new(),
            points_plotted: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn record_chart(&mut self, path: PathBuf, points: usize) {
        log::info!("Chart saved: {} ({} points)", path.display(), points);
        self.charts.push(path);
        self.points_plotted += points;
    }

    pub fn notice(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Notice, subject.into(), message.into());
    }

    pub fn warn(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, subject.into(), message.into());
    }

    /// Record a failure with its full cause chain
    pub fn error(&mut self, subject: impl Into<String>, err: &anyhow::Error) {
        self.push(Severity::Error, subject.into(), format!("{:#}", err));
    }

    fn push(&mut self, severity: Severity, subject: String, message: String) {
        match severity {
            Severity::Notice => log::info!("{}", message),
            Severity::Warning => log::warn!("{}: {}", subject, message),
            Severity::Error => log::error!("{}: {}", subject, message),
        }
        self.diagnostics.push(Diagnostic {
            timestamp: Utc::now(),
            severity,
            subject,
            message,
        });
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    /// Charts skipped for lack of input
    pub fn skipped(&self) -> usize {
        self.count(Severity::Notice)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Write the report as pretty JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
