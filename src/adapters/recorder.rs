//! Per-tick trend recorder.
//!
//! Appends one row per control tick to `data.csv` so actual-vs-smoothed
//! curves can be plotted offline. Purely observational; nothing reads
//! this file back.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;

use crate::app::ports::{TrendLog, TrendSample};
use crate::error::{Result, StoreError};

pub struct CsvTrendLog {
    path: PathBuf,
}

impl CsvTrendLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TrendLog for CsvTrendLog {
    fn append(&mut self, sample: &TrendSample) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(StoreError::Io)?;
        if file.metadata().map_err(StoreError::Io)?.len() == 0 {
            writeln!(
                file,
                "timestamp,temperature_f,temperature_avg_f,humidity,humidity_avg"
            )
            .map_err(StoreError::Io)?;
        }
        writeln!(
            file,
            "{},{:.2},{:.2},{:.2},{:.2}",
            Utc::now().format("%Y-%m-%dT%H:%M:%S"),
            sample.temperature_f,
            sample.temperature_avg_f,
            sample.humidity,
            sample.humidity_avg,
        )
        .map_err(StoreError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_written_once() {
        let path = std::env::temp_dir().join("chamberctl-trend-test.csv");
        let _ = std::fs::remove_file(&path);
        let mut log = CsvTrendLog::new(&path);

        let sample = TrendSample {
            temperature_f: 61.2,
            temperature_avg_f: 60.9,
            humidity: 71.5,
            humidity_avg: 70.8,
        };
        log.append(&sample).unwrap();
        log.append(&sample).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,"));
        assert!(lines[1].ends_with(",61.20,60.90,71.50,70.80"));
    }
}
