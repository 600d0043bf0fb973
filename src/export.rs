use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use rust_xlsxwriter::Workbook;
use tracing::debug;

use crate::columns::ColumnMap;
use crate::config::OutputFormat;
use crate::error::ExportError;

/// `<output_dir>/<region>_properties.<ext>`
pub(crate) fn target_path(output_dir: &Path, region: &str, format: OutputFormat) -> PathBuf {
    output_dir.join(format!("{}_properties.{}", region, format.extension()))
}

/// Keeps the mapped columns present in `df`, in map order, renamed to their labels
pub(crate) fn select_and_rename(df: &DataFrame, columns: &ColumnMap) -> PolarsResult<DataFrame> {
    let available = df.get_column_names();
    let selected = columns.select(&available);

    let mut export = df.select(selected.iter().map(|(key, _)| *key))?;
    for (key, label) in &selected {
        export.rename(key, label)?;
    }
    Ok(export)
}

/// Longest text Excel accepts in one cell
const EXCEL_CELL_LIMIT: usize = 32_767;

/// Writes the export file and returns the number of exported rows
pub(crate) fn write_export(
    df: &DataFrame,
    columns: &ColumnMap,
    path: &Path,
    format: OutputFormat,
) -> Result<usize, ExportError> {
    let mut export = select_and_rename(df, columns)?;
    debug!("Exporting {} columns to {}", export.width(), path.display());

    match format {
        OutputFormat::Csv => write_csv(&mut export, path)?,
        OutputFormat::Excel => write_excel(&export, path)?,
        OutputFormat::Json => write_json(&mut export, path)?,
    }

    // A frame without any mapped column has width 0 and reports no height
    Ok(df.height())
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), ExportError> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(df)?;
    Ok(())
}

/// JSON array of records, one object per row
fn write_json(df: &mut DataFrame, path: &Path) -> Result<(), ExportError> {
    let mut file = File::create(path)?;
    JsonWriter::new(&mut file)
        .with_json_format(JsonFormat::Json)
        .finish(df)?;
    Ok(())
}

fn excel_text(text: &str) -> String {
    if text.chars().count() > EXCEL_CELL_LIMIT {
        text.chars().take(EXCEL_CELL_LIMIT).collect()
    } else {
        text.to_string()
    }
}

fn write_excel(df: &DataFrame, path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, series) in df.get_columns().iter().enumerate() {
        let col = col as u16;
        worksheet.write_string(0, col, excel_text(series.name()))?;

        let numeric = series.dtype().is_numeric();
        for row in 0..series.len() {
            let cell = row as u32 + 1;
            match series.get(row)? {
                AnyValue::Null => {}
                AnyValue::Boolean(b) => {
                    worksheet.write_boolean(cell, col, b)?;
                }
                AnyValue::Utf8(s) => {
                    worksheet.write_string(cell, col, excel_text(s))?;
                }
                value if numeric => match value.extract::<f64>() {
                    Some(n) => {
                        worksheet.write_number(cell, col, n)?;
                    }
                    None => {
                        worksheet.write_string(cell, col, excel_text(&value.to_string()))?;
                    }
                },
                value => {
                    worksheet.write_string(cell, col, excel_text(&value.to_string()))?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}
