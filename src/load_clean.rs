use crate::error::PipelineError;
use crate::table::{Column, Table};
use csv::{ErrorKind, ReaderBuilder, StringRecord};
use log::{debug, info};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

// Cell contents read as "no value".
const MISSING_MARKERS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

// Load data into a table, keeping header labels exactly as stored
pub(crate) fn load_table(file_path: &Path) -> Result<Table, PipelineError> {
    let file = File::open(file_path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => PipelineError::NotFound {
            path: file_path.to_path_buf(),
        },
        _ => PipelineError::Io(err),
    })?;

    let table = read_table(file)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        table.row_count(),
        table.columns().len(),
        file_path.display()
    );
    Ok(table)
}

pub(crate) fn read_table<R: Read>(source: R) -> Result<Table, PipelineError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(source);

    let headers = reader.headers().map_err(parse_error)?.clone();
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for result in reader.records() {
        let record: StringRecord = result.map_err(parse_error)?;
        for (column, value) in cells.iter_mut().zip(record.iter()) {
            column.push(present(value).map(str::to_string));
        }
    }

    let columns = headers
        .iter()
        .zip(cells)
        .map(|(name, values)| infer_column(name, values))
        .collect();

    Table::from_columns(columns)
}

fn present(value: &str) -> Option<&str> {
    let value = value.trim();
    if MISSING_MARKERS.contains(&value) {
        None
    } else {
        Some(value)
    }
}

// A column is numeric when every present cell parses as a number
fn infer_column(name: &str, values: Vec<Option<String>>) -> Column {
    let parsed: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|value| match value {
            Some(text) => text.parse::<f64>().ok().map(Some),
            None => Some(None),
        })
        .collect();

    match parsed {
        Some(numbers) => {
            debug!("Column {:?} inferred as numeric", name);
            Column::numeric(name, numbers)
        }
        None => {
            debug!("Column {:?} inferred as text", name);
            Column::text(name, values)
        }
    }
}

fn parse_error(err: csv::Error) -> PipelineError {
    let line = err.position().map(|pos| pos.line()).unwrap_or(0);
    let message = match err.kind() {
        ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => Some(format!("expected {} fields, found {}", expected_len, len)),
        ErrorKind::Utf8 { err: utf8, .. } => Some(utf8.to_string()),
        _ => None,
    };
    match message {
        Some(message) => PipelineError::Parse { line, message },
        None => PipelineError::Csv(err),
    }
}
