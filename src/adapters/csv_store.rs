//! CSV-backed learning store adapter.
//!
//! Each [`LearnChannel`] gets its own append-only history file
//! (`learn-cool.csv`, `learn-heat.csv`, ...). Row layout:
//!
//! ```text
//! 2026-08-30T14:02:11,42.5,59.87,58.0,62.3
//! timestamp (UTC)    |run_s|reached|key|start
//! ```
//!
//! Loading scans the whole file and keeps the duration of the *last* row
//! whose key matches, so recalibrating after a band change picks up the
//! history recorded for that band and ignores the rest. Malformed rows
//! are skipped with a warning rather than failing the load; a corrupt
//! line should cost one observation, not the whole calibration history.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::warn;

use crate::app::ports::{LearnChannel, LearnRecord, LearnStore};
use crate::error::Result;

/// Keys are written at one decimal place, so anything closer than half
/// that resolution is the same key.
const KEY_EPSILON: f64 = 0.05;

pub struct CsvLearnStore {
    dir: PathBuf,
}

impl CsvLearnStore {
    /// Store rooted at `dir`; created if absent.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(crate::error::StoreError::Io)?;
        Ok(Self { dir })
    }

    fn path_for(&self, channel: LearnChannel) -> PathBuf {
        let name = match channel {
            LearnChannel::Cool => "learn-cool.csv",
            LearnChannel::Heat => "learn-heat.csv",
            LearnChannel::Humidify => "learn-humidify.csv",
            LearnChannel::Dehumidify => "learn-dehumidify.csv",
        };
        self.dir.join(name)
    }
}

impl LearnStore for CsvLearnStore {
    fn load(&mut self, channel: LearnChannel, default_secs: f64, key: f64) -> Result<f64> {
        let path = self.path_for(channel);
        if !path.exists() {
            return Ok(default_secs);
        }

        let file = File::open(&path).map_err(crate::error::StoreError::Io)?;
        let mut last_secs = default_secs;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(crate::error::StoreError::Io)?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_row(&line) {
                Some((row_secs, row_key)) => {
                    if (row_key - key).abs() < KEY_EPSILON {
                        last_secs = row_secs;
                    }
                }
                None => {
                    warn!(
                        "{}: skipping malformed row {}: {:?}",
                        path.display(),
                        line_no + 1,
                        line
                    );
                }
            }
        }
        Ok(last_secs)
    }

    fn save(&mut self, channel: LearnChannel, record: &LearnRecord) -> Result<()> {
        let path = self.path_for(channel);
        append_row(&path, record).map_err(crate::error::StoreError::Io)?;
        Ok(())
    }
}

/// Pull (run_secs, key) out of one row, `None` if it doesn't parse.
fn parse_row(line: &str) -> Option<(f64, f64)> {
    let mut fields = line.split(',');
    let _timestamp = fields.next()?;
    let run_secs: f64 = fields.next()?.trim().parse().ok()?;
    let _achieved = fields.next()?;
    let key: f64 = fields.next()?.trim().parse().ok()?;
    if !run_secs.is_finite() || !key.is_finite() {
        return None;
    }
    Some((run_secs, key))
}

fn append_row(path: &Path, record: &LearnRecord) -> std::io::Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    writeln!(
        file,
        "{},{:.1},{:.2},{:.1},{:.1}",
        Utc::now().format("%Y-%m-%dT%H:%M:%S"),
        record.run_secs,
        record.achieved,
        record.key,
        record.start_value,
    )
}
