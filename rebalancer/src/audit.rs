//! JSONL audit journal.
//!
//! Every [`Notice`] the agent emits is also appended to an audit file, one
//! JSON object per line: `{"event": ..., "ts": ..., <notice fields>}`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

use crate::error::Result;
use crate::notify::{Notice, Notifier};

/// One line of the journal.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only journal writer.
pub struct AuditLog {
    writer: BufWriter<File>,
}

impl AuditLog {
    /// Open (or create) `path` for appending, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Append one event. Flushed before returning.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn log_notice(&mut self, notice: &Notice) -> Result<()> {
        let data = serde_json::to_value(notice).map_err(std::io::Error::other)?;
        self.log(notice.event(), data)
    }
}

impl Notifier for AuditLog {
    fn notify(&mut self, notice: &Notice) {
        if let Err(e) = self.log_notice(notice) {
            warn!("Failed to write audit event {}: {e}", notice.event());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::AbandonReason;
    use pairbalance::Side;

    #[test]
    fn notices_become_jsonl_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log.notify(&Notice::Started {
                pairs: vec!["ETH/USDT".parse().unwrap()],
            });
            log.notify(&Notice::Abandoned {
                symbol: "ETH/USDT".parse().unwrap(),
                side: Side::Sell,
                reason: AbandonReason::EmptyBook,
                attempts: 3,
            });
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "started");
        assert_eq!(lines[0]["pairs"][0], "ETH/USDT");
        assert!(lines[0]["ts"].is_string());
        assert_eq!(lines[1]["event"], "abandoned");
        assert_eq!(lines[1]["side"], "sell");
        assert_eq!(lines[1]["reason"], "empty_book");
        assert_eq!(lines[1]["attempts"], 3);
    }

    #[test]
    fn reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("audit.jsonl");

        for _ in 0..2 {
            let mut log = AuditLog::open(&path).unwrap();
            log.log("ping", serde_json::json!({})).unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
