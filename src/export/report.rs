//! CSV / JSON output of an [`EvaluationReport`].
//!
//! ```text
//! output_dir/
//! ├── summary.json              headline metrics, threshold, spread summaries
//! ├── evaluation_records.csv    one row per test prediction
//! ├── daily_ic.csv
//! ├── ic_monthly.csv
//! ├── ic_quarterly.csv
//! ├── long_short.csv            overlapped, with cumulative return
//! ├── long_short_purged.csv     every H-th date
//! ├── bucket_returns.csv        date, Q1..Qn
//! └── latest_forecasts.csv
//! ```

use crate::error::Result;
use crate::evaluation::{EvaluationReport, LongShortReport};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct LongShortRow {
    date: NaiveDate,
    n: usize,
    k: usize,
    spread: f64,
    top_hit: f64,
    r_top: f64,
    r_bottom: f64,
    cumulative: f64,
}

/// Writes report tables into one directory.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Write every table plus `summary.json`; returns the paths written.
    pub fn write(&self, report: &EvaluationReport) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)?;
        let mut files = Vec::with_capacity(9);

        let summary = self.output_dir.join("summary.json");
        serde_json::to_writer_pretty(File::create(&summary)?, report)?;
        files.push(summary);

        files.push(self.write_rows("evaluation_records.csv", &report.records)?);
        files.push(self.write_rows("daily_ic.csv", &report.ic.daily)?);
        files.push(self.write_rows("ic_monthly.csv", &report.ic.monthly)?);
        files.push(self.write_rows("ic_quarterly.csv", &report.ic.quarterly)?);
        files.push(self.write_long_short("long_short.csv", &report.long_short)?);
        files.push(self.write_long_short("long_short_purged.csv", &report.long_short_purged)?);
        files.push(self.write_buckets(report)?);
        files.push(self.write_rows("latest_forecasts.csv", &report.latest)?);

        log::info!("Wrote {} report files to {}", files.len(), self.output_dir.display());
        Ok(files)
    }

    fn write_rows<T: Serialize>(&self, file_name: &str, rows: &[T]) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let mut wtr = csv::Writer::from_path(&path)?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(path)
    }

    fn write_long_short(&self, file_name: &str, report: &LongShortReport) -> Result<PathBuf> {
        let rows: Vec<LongShortRow> = report
            .days
            .iter()
            .zip(&report.summary.cumulative)
            .map(|(d, &cumulative)| LongShortRow {
                date: d.date,
                n: d.n,
                k: d.k,
                spread: d.spread,
                top_hit: d.top_hit,
                r_top: d.r_top,
                r_bottom: d.r_bottom,
                cumulative,
            })
            .collect();
        self.write_rows(file_name, &rows)
    }

    fn write_buckets(&self, report: &EvaluationReport) -> Result<PathBuf> {
        let path = self.output_dir.join("bucket_returns.csv");
        let mut wtr = csv::Writer::from_path(&path)?;

        let mut header = vec!["date".to_string()];
        header.extend((1..=report.buckets.n_buckets).map(|q| format!("Q{q}")));
        wtr.write_record(&header)?;

        for day in &report.buckets.days {
            let mut record = Vec::with_capacity(day.means.len() + 1);
            record.push(day.date.to_string());
            // empty cell for a bucket with no members that day
            record.extend(day.means.iter().map(|m| m.map(|v| v.to_string()).unwrap_or_default()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(path)
    }
}
