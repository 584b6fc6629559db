//! CSV/JSON exports.
//!
//! Everything written here is meant to be easy to consume from spreadsheets or
//! the external model: one header row, one record per time step (or per plot
//! row), missing values as empty fields.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{ColumnData, TimeSeriesTable};
use crate::error::{AppError, Result};
use crate::plotdata::{EvaluationTable, PERIOD_COLUMNS, PlotFrame};
use crate::prep::{FeatureMatrix, PreparedManifest};

/// Header used for the index column of exported tables.
pub const INDEX_HEADER: &str = "time";

pub fn write_table_csv(path: &Path, table: &TimeSeriesTable) -> Result<()> {
    let mut writer = create_csv(path)?;
    write_table(&mut writer, table)?;
    flush(writer)
}

pub fn write_table<W: Write>(writer: &mut csv::Writer<W>, table: &TimeSeriesTable) -> Result<()> {
    let mut header = vec![INDEX_HEADER.to_string()];
    header.extend(table.column_names().into_iter().map(str::to_string));
    write_record(writer, &header)?;

    for (row, key) in table.index().keys().iter().enumerate() {
        let mut record = vec![key.to_string()];
        for col in table.columns() {
            record.push(match &col.data {
                ColumnData::Numeric(values) => values[row].map(|v| v.to_string()).unwrap_or_default(),
                ColumnData::Text(values) => values[row].clone().unwrap_or_default(),
            });
        }
        write_record(writer, &record)?;
    }
    Ok(())
}

/// One record per plot row, period bounds repeated on each.
pub fn write_plot_frame_csv(path: &Path, frame: &PlotFrame) -> Result<()> {
    let mut writer = create_csv(path)?;
    write_plot_frame(&mut writer, frame)?;
    flush(writer)
}

pub fn write_plot_frame<W: Write>(writer: &mut csv::Writer<W>, frame: &PlotFrame) -> Result<()> {
    for record in frame.records() {
        writer
            .serialize(&record)
            .map_err(|e| AppError::Io(format!("Failed to write plot row: {e}")))?;
    }
    Ok(())
}

pub fn write_feature_matrix_csv(path: &Path, features: &FeatureMatrix) -> Result<()> {
    let mut writer = create_csv(path)?;
    let mut header = vec![INDEX_HEADER.to_string()];
    header.extend(features.names.iter().cloned());
    write_record(&mut writer, &header)?;

    for (i, key) in features.index.iter().enumerate() {
        let mut record = vec![key.to_string()];
        record.extend(features.matrix.row(i).iter().map(|v| v.to_string()));
        write_record(&mut writer, &record)?;
    }
    flush(writer)
}

/// Evaluation table in the wide shape the plot pipeline reads back.
pub fn write_evaluation_csv(path: &Path, table: &EvaluationTable) -> Result<()> {
    let mut writer = create_csv(path)?;
    let mut header = vec![INDEX_HEADER.to_string()];
    header.extend(table.columns().iter().map(|c| c.name.clone()));
    header.extend(PERIOD_COLUMNS.iter().map(|c| c.to_string()));
    write_record(&mut writer, &header)?;

    let p = table.periods();
    let bounds = [p.pre.start, p.pre.end, p.post.start, p.post.end].map(|k| k.to_string());
    for (row, key) in table.index().keys().iter().enumerate() {
        let mut record = vec![key.to_string()];
        for col in table.columns() {
            let value = col.values().and_then(|v| v[row]);
            record.push(value.map(|v| v.to_string()).unwrap_or_default());
        }
        record.extend(bounds.iter().cloned());
        write_record(&mut writer, &record)?;
    }
    flush(writer)
}

pub fn write_manifest_json(path: &Path, manifest: &PreparedManifest) -> Result<()> {
    write_json(path, manifest)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| AppError::Io(format!("Failed to create JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| AppError::Io(format!("Failed to write JSON '{}': {e}", path.display())))
}

fn create_csv(path: &Path) -> Result<csv::Writer<File>> {
    csv::Writer::from_path(path)
        .map_err(|e| AppError::Io(format!("Failed to create CSV '{}': {e}", path.display())))
}

fn write_record<W: Write>(writer: &mut csv::Writer<W>, record: &[String]) -> Result<()> {
    writer
        .write_record(record)
        .map_err(|e| AppError::Io(format!("Failed to write CSV row: {e}")))
}

fn flush<W: Write>(mut writer: csv::Writer<W>) -> Result<()> {
    writer
        .flush()
        .map_err(|e| AppError::Io(format!("Failed to flush CSV: {e}")))
}
