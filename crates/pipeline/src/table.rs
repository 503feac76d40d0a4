//! The `sample_date,avg_ndvi` output table

use fieldndvi_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

pub const HEADER: [&str; 2] = ["sample_date", "avg_ndvi"];

/// One row of the output table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub sample_date: String,
    pub avg_ndvi: f64,
}

impl SampleRecord {
    pub fn new(sample_date: impl Into<String>, avg_ndvi: f64) -> Self {
        Self {
            sample_date: sample_date.into(),
            avg_ndvi,
        }
    }
}

fn csv_err(e: csv::Error) -> Error {
    if e.is_io_error() {
        if let csv::ErrorKind::Io(io) = e.into_kind() {
            return Error::Io(io);
        }
        return Error::Format("invalid sample table".into());
    }
    Error::Format(format!("invalid sample table: {}", e))
}

/// `Debug` output round-trips exactly and keeps `.0` on integral values.
fn format_value(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{:?}", v)
    }
}

/// Write the table to any writer, header first, `\n` line endings.
///
/// Non-finite values are written as `nan`, `inf` and `-inf`.
pub fn write_sample_table_to<W: Write>(writer: W, records: &[SampleRecord]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(HEADER).map_err(csv_err)?;
    for record in records {
        let value = format_value(record.avg_ndvi);
        csv.write_record([record.sample_date.as_str(), value.as_str()])
            .map_err(csv_err)?;
    }
    csv.flush()?;
    Ok(())
}

/// Read a table written by [`write_sample_table_to`]
pub fn read_sample_table<P: AsRef<Path>>(path: P) -> Result<Vec<SampleRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?;
    if headers.iter().ne(HEADER) {
        return Err(Error::Format(format!(
            "unexpected table header: {}",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    reader
        .deserialize()
        .map(|row| row.map_err(csv_err))
        .collect()
}
