// ==============================================================================
// run_log.rs - Per-Stage Run Logs
// ==============================================================================
// Description: Human-readable stage logs plus a JSON run summary with digests
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-01-17
// Version: 2.0.0
// ==============================================================================
// Files written into the log directory for stage <stage>:
//   <stage>.log            one line per event: timestamp, severity, message
//   <stage>.summary.json   run id, timings, counters, output SHA-256 digests
// ==============================================================================

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RunLogError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warning,
}

impl LogSeverity {
    fn label(&self) -> &'static str {
        match self {
            LogSeverity::Info => "INFO",
            LogSeverity::Warning => "WARN",
        }
    }
}

/// A file written by the stage
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutputRecord {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

/// Contents of `<stage>.summary.json`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub stage: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counters: BTreeMap<String, serde_json::Value>,
    pub warnings: usize,
    pub outputs: Vec<OutputRecord>,
}

/// Streaming log for one stage run
pub struct RunLog {
    run_id: Uuid,
    stage: String,
    started_at: DateTime<Utc>,
    log_dir: PathBuf,
    writer: BufWriter<File>,
    counters: BTreeMap<String, serde_json::Value>,
    warnings: usize,
    outputs: Vec<OutputRecord>,
}

impl RunLog {
    /// Create `<log_dir>/<stage>.log`, creating the directory if needed
    pub fn create(log_dir: impl AsRef<Path>, stage: &str) -> Result<Self, RunLogError> {
        let log_dir = log_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&log_dir).map_err(|source| RunLogError::Io {
            path: log_dir.clone(),
            source,
        })?;

        let log_path = log_dir.join(format!("{}.log", stage));
        let file = File::create(&log_path).map_err(|source| RunLogError::Io {
            path: log_path.clone(),
            source,
        })?;

        let mut log = Self {
            run_id: Uuid::new_v4(),
            stage: stage.to_string(),
            started_at: Utc::now(),
            log_dir,
            writer: BufWriter::new(file),
            counters: BTreeMap::new(),
            warnings: 0,
            outputs: Vec::new(),
        };
        let run_id = log.run_id;
        log.info(format!("Stage {} started (run {})", stage, run_id))?;
        Ok(log)
    }

    fn path(&self, suffix: &str) -> PathBuf {
        self.log_dir.join(format!("{}.{}", self.stage, suffix))
    }

    fn write_line(&mut self, severity: LogSeverity, message: &str) -> Result<(), RunLogError> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let path = self.path("log");
        writeln!(self.writer, "{} [{}] {}", timestamp, severity.label(), message)
            .map_err(|source| RunLogError::Io { path, source })
    }

    pub fn info(&mut self, message: impl AsRef<str>) -> Result<(), RunLogError> {
        info!("{}", message.as_ref());
        self.write_line(LogSeverity::Info, message.as_ref())
    }

    pub fn warn(&mut self, message: impl AsRef<str>) -> Result<(), RunLogError> {
        warn!("{}", message.as_ref());
        self.warnings += 1;
        self.write_line(LogSeverity::Warning, message.as_ref())
    }

    /// Record a named counter; also logged as `key: value`
    pub fn count(&mut self, key: &str, value: impl Serialize) -> Result<(), RunLogError> {
        let value = serde_json::to_value(value)?;
        self.info(format!("{}: {}", key, value))?;
        self.counters.insert(key.to_string(), value);
        Ok(())
    }

    /// Register a written file and its digest
    pub fn output(&mut self, path: impl AsRef<Path>) -> Result<(), RunLogError> {
        let path = path.as_ref().to_path_buf();
        let (size, sha256) = sha256_file(&path).map_err(|source| RunLogError::Io {
            path: path.clone(),
            source,
        })?;
        self.info(format!("Wrote {} ({} bytes, sha256 {})", path.display(), size, sha256))?;
        self.outputs.push(OutputRecord { path, size, sha256 });
        Ok(())
    }

    /// Flush the log and write `<stage>.summary.json`
    pub fn finish(mut self) -> Result<RunSummary, RunLogError> {
        let finished_at = Utc::now();
        let elapsed = finished_at - self.started_at;
        let message = format!(
            "Stage {} finished in {} ms ({} warnings)",
            self.stage,
            elapsed.num_milliseconds(),
            self.warnings
        );
        self.info(message)?;

        let log_path = self.path("log");
        self.writer
            .flush()
            .map_err(|source| RunLogError::Io { path: log_path, source })?;

        let summary = RunSummary {
            run_id: self.run_id,
            stage: self.stage.clone(),
            started_at: self.started_at,
            finished_at,
            counters: std::mem::take(&mut self.counters),
            warnings: self.warnings,
            outputs: std::mem::take(&mut self.outputs),
        };

        let summary_path = self.path("summary.json");
        let file = File::create(&summary_path).map_err(|source| RunLogError::Io {
            path: summary_path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &summary)?;
        writer
            .flush()
            .map_err(|source| RunLogError::Io { path: summary_path, source })?;

        Ok(summary)
    }
}

/// Size and lowercase hex SHA-256 of a file
pub fn sha256_file(path: &Path) -> io::Result<(u64, String)> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];
    let mut size = 0u64;

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        size += n as u64;
        hasher.update(&buffer[..n]);
    }

    Ok((size, format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_and_summary_written() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("filtered_rsids.txt");
        std::fs::write(&out, "rs1\n").unwrap();

        let mut log = RunLog::create(dir.path().join("logs"), "filter").unwrap();
        log.count("snps_before", 4).unwrap();
        log.warn("something odd").unwrap();
        log.output(&out).unwrap();
        let summary = log.finish().unwrap();

        assert_eq!(summary.stage, "filter");
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.counters["snps_before"], serde_json::json!(4));
        assert_eq!(summary.outputs[0].size, 4);

        let text = std::fs::read_to_string(dir.path().join("logs/filter.log")).unwrap();
        assert!(text.contains("[INFO] snps_before: 4"));
        assert!(text.contains("[WARN] something odd"));

        let json = std::fs::read_to_string(dir.path().join("logs/filter.summary.json")).unwrap();
        let parsed: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id, summary.run_id);
    }

    #[test]
    fn test_sha256_known_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, "abc").unwrap();

        let (size, digest) = sha256_file(&path).unwrap();
        assert_eq!(size, 3);
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
