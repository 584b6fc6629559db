//! CSV ingest.
//!
//! Two file shapes are read, both with the time index in the first column:
//!
//! - **input series**: every other column is a variable (target and covariates)
//! - **evaluation output**: statistic columns named `<scale prefix><statistic>`
//!   plus the four period-boundary columns, constant on every row
//!
//! Cells reading `NA`, `NaN`, `null`, `none` (any case) or nothing are missing
//! values. A column with any other non-numeric cell becomes a text column and is
//! left for the dataset assembler to reject.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{Column, IndexKey, IndexKind, Period, Periods, TimeIndex, TimeSeriesTable};
use crate::error::{AppError, Result};
use crate::plotdata::{EvaluationTable, PERIOD_COLUMNS};

const MISSING_TOKENS: [&str; 5] = ["", "na", "nan", "null", "none"];

/// Header row plus the raw records, with the index already parsed.
struct RawCsv {
    headers: Vec<String>,
    index: TimeIndex,
    records: Vec<StringRecord>,
}

/// Read an input series.
///
/// `index_kind` overrides index type inference (integer, then date, then timestamp).
pub fn read_table_csv(path: &Path, index_kind: Option<IndexKind>) -> Result<TimeSeriesTable> {
    let file = open(path)?;
    read_table(file, index_kind)
}

pub fn read_table<R: Read>(reader: R, index_kind: Option<IndexKind>) -> Result<TimeSeriesTable> {
    let raw = read_raw(reader, index_kind)?;
    let columns = (1..raw.headers.len())
        .map(|c| parse_column(&raw.headers[c], &raw.records, c))
        .collect();
    let table = TimeSeriesTable::new(raw.index, columns)?;
    debug!(
        rows = table.len(),
        columns = table.columns().len(),
        "read input series"
    );
    Ok(table)
}

/// Read a model evaluation table.
pub fn read_evaluation_csv(path: &Path, index_kind: Option<IndexKind>) -> Result<EvaluationTable> {
    let file = open(path)?;
    read_evaluation(file, index_kind)
}

pub fn read_evaluation<R: Read>(reader: R, index_kind: Option<IndexKind>) -> Result<EvaluationTable> {
    let mut raw = read_raw(reader, index_kind)?;
    for h in raw.headers.iter_mut() {
        *h = h.to_ascii_lowercase();
    }
    let kind = raw.index.kind().unwrap_or(IndexKind::Integer);

    let mut bounds = Vec::with_capacity(PERIOD_COLUMNS.len());
    for name in PERIOD_COLUMNS {
        let pos = raw
            .headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AppError::MissingColumn(format!("evaluation column `{name}`")))?;
        bounds.push(constant_bound(name, &raw.records, pos, kind)?);
    }
    let periods = Periods {
        pre: Period {
            start: bounds[0],
            end: bounds[1],
        },
        post: Period {
            start: bounds[2],
            end: bounds[3],
        },
    };

    let mut columns = Vec::new();
    for c in 1..raw.headers.len() {
        let name = &raw.headers[c];
        if PERIOD_COLUMNS.contains(&name.as_str()) {
            continue;
        }
        let column = parse_column(name, &raw.records, c);
        if column.is_numeric() {
            columns.push(column);
        } else {
            warn!(column = %name, "skipping non-numeric evaluation column");
        }
    }
    EvaluationTable::new(raw.index, columns, periods)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| AppError::Io(format!("Failed to open CSV '{}': {e}", path.display())))
}

fn read_raw<R: Read>(reader: R, index_kind: Option<IndexKind>) -> Result<RawCsv> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::Io(format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();
    if headers.is_empty() {
        return Err(AppError::Schema("CSV has no columns.".to_string()));
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header and lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::Io(format!("CSV parse error on line {line}: {e}")))?;
        records.push(record);
    }
    if records.is_empty() {
        return Err(AppError::Schema("CSV has no data rows.".to_string()));
    }

    let first = records[0].get(0).unwrap_or("");
    let kind = match index_kind {
        Some(kind) => kind,
        None => IndexKind::infer(first).ok_or_else(|| {
            AppError::Schema(format!(
                "Cannot infer the type of index column `{}` from '{first}'. Expected an integer, a date or a timestamp.",
                headers[0]
            ))
        })?,
    };

    let keys = records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let cell = record.get(0).unwrap_or("");
            kind.parse(cell).ok_or_else(|| {
                AppError::Schema(format!(
                    "Line {}: cannot parse index value '{cell}' as {kind:?}.",
                    idx + 2
                ))
            })
        })
        .collect::<Result<Vec<IndexKey>>>()?;

    Ok(RawCsv {
        headers,
        index: TimeIndex::new(keys)?,
        records,
    })
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS.iter().any(|t| cell.eq_ignore_ascii_case(t))
}

/// Numeric if every present cell parses as a number, text otherwise.
fn parse_column(name: &str, records: &[StringRecord], pos: usize) -> Column {
    let cells: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.get(pos).filter(|s| !is_missing(s)))
        .collect();

    let numeric: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => s.parse::<f64>().ok().map(|v| v.is_finite().then_some(v)),
        })
        .collect();

    match numeric {
        Some(values) => Column::numeric(name, values),
        None => Column::text(name, cells.iter().map(|c| c.map(str::to_string)).collect()),
    }
}

fn constant_bound(name: &str, records: &[StringRecord], pos: usize, kind: IndexKind) -> Result<IndexKey> {
    let mut value: Option<&str> = None;
    for cell in records.iter().filter_map(|r| r.get(pos)).filter(|s| !is_missing(s)) {
        match value {
            None => value = Some(cell),
            Some(v) if v == cell => {}
            Some(v) => {
                return Err(AppError::Schema(format!(
                    "`{name}` must be constant across rows; found '{v}' and '{cell}'."
                )));
            }
        }
    }
    let value = value.ok_or_else(|| AppError::Schema(format!("`{name}` has no value.")))?;
    kind.parse(value)
        .ok_or_else(|| AppError::Schema(format!("`{name}` value '{value}' is not a valid {kind:?} index value.")))
}
