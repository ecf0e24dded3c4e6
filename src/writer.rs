use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::info;
use serde::Serialize;
use serde_jsonlines::JsonLinesWriter;

use crate::errors::PaddockError;

/// Write one JSON document per line.
pub fn write_json_lines<T: Serialize>(file: &Path, items: &[T]) -> Result<(), PaddockError> {
    let output = File::create(file).map_err(|e| PaddockError::OutputError { source: e })?;
    let mut writer = JsonLinesWriter::new(BufWriter::new(output));
    writer
        .write_all(items)
        .map_err(|e| PaddockError::OutputError { source: e })?;
    writer
        .flush()
        .map_err(|e| PaddockError::OutputError { source: e })?;
    info!("Wrote {} lines to {}", items.len(), file.display());
    Ok(())
}

/// Pretty-print a value as JSON followed by a newline.
pub fn write_pretty<T: Serialize, W: Write>(out: W, value: &T) -> Result<(), PaddockError> {
    let mut out = out;
    serde_json::to_writer_pretty(&mut out, value)
        .map_err(|e| PaddockError::OutputError { source: e.into() })?;
    writeln!(out).map_err(|e| PaddockError::OutputError { source: e })
}
