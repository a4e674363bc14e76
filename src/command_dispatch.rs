//! Purpose: Hold top-level CLI command dispatch for `tabwire`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Decode emits one JSON array per row, or a single ASCII table.
//! Invariants: Inputs are read fully before any output is written.
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::json;

use tabwire::api::{
    DecodeOptions, MemoryTable, Record, Value as FieldValue, decode_with, encode,
    limit_from_signed, materialize, project, quantize, render_ascii_table,
};

use super::*;
use crate::value_json::{record_from_json, value_to_json};

const STDIN_MARKER: &str = "-";
const ROW_BATCH_SIZE: usize = 1024;

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Decode {
            inputs,
            format,
            columns,
            limit,
            max_record_size,
            no_size_limit,
        } => {
            let options = if no_size_limit {
                DecodeOptions::unbounded()
            } else if let Some(max) = max_record_size {
                DecodeOptions::new().with_max_record_size(max)
            } else {
                DecodeOptions::default()
            };

            let mut records = Vec::with_capacity(inputs.len());
            for input in &inputs {
                let buf = read_input(input)?;
                let record = decode_with(&buf, &options).map_err(|err| {
                    if err.hint().is_some() {
                        err
                    } else {
                        err.with_hint(format!("while decoding {}", input.display()))
                    }
                })?;
                records.push(record);
            }

            let arity = records.first().map_or(0, Record::len);
            if let Some((idx, _)) = records
                .iter()
                .enumerate()
                .find(|(_, record)| record.len() != arity)
            {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!(
                        "{} has {} fields, first input has {arity}",
                        inputs[idx].display(),
                        records[idx].len()
                    ))
                    .with_hint("Decode inputs of differing shape separately."));
            }
            let indices = columns.unwrap_or_else(|| (0..arity).collect());
            let rows = select_rows(&records, &indices, limit.and_then(limit_from_signed))?;

            match format {
                OutputFormat::Json => {
                    for row in &rows {
                        let values = row.fields().iter().map(value_to_json).collect();
                        emit_json_line(&Value::Array(values))?;
                    }
                }
                OutputFormat::Table => {
                    let headers: Vec<String> = indices.iter().map(|idx| format!("f{idx}")).collect();
                    write_stdout(render_ascii_table(&headers, &rows).as_bytes())?;
                }
            }
            Ok(RunOutcome::ok())
        }
        Command::Encode { input, output } => {
            let input = input.unwrap_or_else(|| STDIN_MARKER.into());
            let text = read_input(&input)?;
            let json: Value = serde_json::from_slice(&text).map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message("input is not valid JSON")
                    .with_source(err)
            })?;
            let record = record_from_json(&json)?;
            let frame = encode(&record)?;
            fs::write(&output, &frame).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message(format!("failed to write {}", output.display()))
                    .with_source(err)
            })?;
            emit_json_line(&json!({
                "path": output.display().to_string(),
                "fields": record.len(),
                "bytes": frame.len(),
            }))?;
            Ok(RunOutcome::ok())
        }
        Command::Quantize { value, bits } => {
            let quantized = quantize(value, bits)?;
            emit_json_line(&json!({
                "input": value_to_json(&FieldValue::Float(value)),
                "bits": bits,
                "value": value_to_json(&FieldValue::Float(quantized)),
            }))?;
            Ok(RunOutcome::ok())
        }
    }
}

/// Narrows decoded rows to `indices`, then rebuilds row-major records.
fn select_rows(
    records: &[Record],
    indices: &[usize],
    limit: Option<usize>,
) -> Result<Vec<Record>, Error> {
    let columns = project(records, indices, limit)?;
    if columns.is_empty() {
        let num_rows = limit.map_or(records.len(), |limit| limit.min(records.len()));
        let table = MemoryTable::without_columns(num_rows);
        return materialize(&table, Record::new, ROW_BATCH_SIZE);
    }
    let table = MemoryTable::from_columns(columns)?;
    materialize(&table, Record::new, ROW_BATCH_SIZE)
}

fn read_input(path: &Path) -> Result<Vec<u8>, Error> {
    if path.as_os_str() == STDIN_MARKER {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read stdin")
                .with_source(err)
        })?;
        return Ok(buf);
    }
    fs::read(path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to read {}", path.display()))
            .with_hint("Check the path and permissions.")
            .with_source(err)
    })
}

fn write_stdout(bytes: &[u8]) -> Result<(), Error> {
    io::stdout().write_all(bytes).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write stdout")
            .with_source(err)
    })
}
