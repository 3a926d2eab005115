//! Flat-file report sinks: CSV log, JSON log and the per-domain histogram

use crate::output::report::ReportEntry;
use crate::output::stats::domain_histogram;
use crate::output::traits::{OutputResult, ReportSink};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes one CSV row per report entry, with a header row
pub struct CsvReportSink {
    path: PathBuf,
}

impl CsvReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for CsvReportSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn write_report(&self, entries: &[ReportEntry]) -> OutputResult<()> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        for entry in entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Writes the report as a pretty-printed JSON array
pub struct JsonReportSink {
    path: PathBuf,
}

impl JsonReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for JsonReportSink {
    fn name(&self) -> &str {
        "json"
    }

    fn write_report(&self, entries: &[ReportEntry]) -> OutputResult<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, entries)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct DomainCount<'a> {
    domain: &'a str,
    pages: usize,
}

/// Writes how many pages were crawled per domain, most crawled first
pub struct DomainSummarySink {
    path: PathBuf,
}

impl DomainSummarySink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for DomainSummarySink {
    fn name(&self) -> &str {
        "domains"
    }

    fn write_report(&self, entries: &[ReportEntry]) -> OutputResult<()> {
        let histogram = domain_histogram(entries);
        let rows: Vec<DomainCount<'_>> = histogram
            .iter()
            .map(|(domain, pages)| DomainCount {
                domain,
                pages: *pages,
            })
            .collect();

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &rows)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
