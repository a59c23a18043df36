use crate::signal::{Sample, SeriesStore};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::warn;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column and timestamp layout of a voltage export.
#[derive(Debug, Clone)]
pub struct CsvLayout {
    pub timestamp_col: String,
    pub value_col: String,
    /// `chrono` format string for the timestamp column.
    pub timestamp_format: String,
    pub delimiter: u8,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            timestamp_col: "Timestamp".into(),
            value_col: "Values".into(),
            timestamp_format: "%d-%m-%Y %H:%M:%S".into(),
            delimiter: b',',
        }
    }
}

/// Parse samples from CSV text, keeping file order.
pub fn parse_samples<R: Read>(reader: R, layout: &CsvLayout) -> Result<Vec<Sample>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(layout.delimiter)
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader.headers().context("reading header")?.clone();
    let ts_idx = locate_column(&headers, &layout.timestamp_col, "timestamp")?;
    let value_idx = locate_column(&headers, &layout.value_col, "value")?;

    let mut samples = Vec::new();
    for (row, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = row + 2;
        let record = result.with_context(|| format!("reading record on line {}", line))?;
        let raw_ts = record
            .get(ts_idx)
            .ok_or_else(|| anyhow!("line {}: missing timestamp", line))?;
        let timestamp = NaiveDateTime::parse_from_str(raw_ts, &layout.timestamp_format)
            .with_context(|| {
                format!(
                    "line {}: timestamp {:?} does not match {:?}",
                    line, raw_ts, layout.timestamp_format
                )
            })?;
        let raw_value = record
            .get(value_idx)
            .ok_or_else(|| anyhow!("line {}: missing value", line))?;
        let value: f64 = raw_value
            .parse()
            .with_context(|| format!("line {}: value is not f64: {}", line, raw_value))?;
        samples.push(Sample { timestamp, value });
    }
    Ok(samples)
}

/// Parse CSV text into a validated store. With `sort` unset, out-of-order rows are an error.
pub fn parse_series<R: Read>(reader: R, layout: &CsvLayout, sort: bool) -> Result<SeriesStore> {
    let samples = parse_samples(reader, layout)?;
    let store = if sort {
        if samples.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
            warn!("input rows are out of time order; sorting");
        }
        SeriesStore::sorted(samples)?
    } else {
        SeriesStore::new(samples)?
    };
    Ok(store)
}

/// Read a voltage CSV export from disk.
pub fn read_series(path: &Path, layout: &CsvLayout, sort: bool) -> Result<SeriesStore> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_series(file, layout, sort).with_context(|| format!("loading {}", path.display()))
}

fn locate_column(headers: &StringRecord, requested: &str, hint: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| anyhow!("missing {} column ({})", hint, requested))
}
