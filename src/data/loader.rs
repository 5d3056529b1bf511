use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use calamine::{open_workbook_auto, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Table, Value};
use crate::error::DatasetError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`          – header row with column names
/// * `.xls`, `.xlsx` – first worksheet, first row is the header
/// * `.parquet`      – flat columns (strings, ints, floats, bools)
/// * `.json`         – `[{ "col": value, ... }, ...]`
///
/// Any other extension fails with [`DatasetError::UnknownFormat`] before the
/// file is opened.
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "xls" | "xlsx" => load_spreadsheet(path),
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => bail!(DatasetError::UnknownFormat {
            path: path.to_path_buf(),
            extension: other.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(|cell| Value::infer(cell.trim())).collect());
    }

    Ok(Table::new(&headers, rows))
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn load_spreadsheet(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no worksheets")?
        .context("reading first worksheet")?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header) => header.iter().map(|cell| cell.to_string()).collect(),
        None => bail!("worksheet in {} is empty", path.display()),
    };

    let rows = sheet_rows
        .map(|row| row.iter().map(spreadsheet_value).collect())
        .collect();

    Ok(Table::new(&headers, rows))
}

fn spreadsheet_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) => Value::Float(*f),
        Data::String(s) => Value::infer(s.trim()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Empty => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `to_json(orient='records')`):
///
/// ```json
/// [
///   { "municipal": "Boston", "naicscode": 611, "avgemp": 1520.0 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map_or(Value::Null, json_to_value))
                .collect()
        })
        .collect();

    Ok(Table::new(&columns, rows))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::infer(s.trim()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat columns. Works with files written by
/// Pandas (`df.to_parquet()`), Polars and the bundled sample generator.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_value(col, row))
                    .collect(),
            );
        }
    }

    Ok(Table::new(&columns, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 => match col.as_any().downcast_ref::<StringArray>() {
            Some(s) => Value::infer(s.value(row).trim()),
            None => Value::Null,
        },
        DataType::LargeUtf8 => Value::infer(col.as_string::<i64>().value(row).trim()),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map_or(Value::Null, |arr| Value::Integer(arr.value(row) as i64)),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map_or(Value::Null, |arr| Value::Integer(arr.value(row))),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map_or(Value::Null, |arr| Value::Float(arr.value(row) as f64)),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map_or(Value::Null, |arr| Value::Float(arr.value(row))),
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map_or(Value::Null, |arr| Value::Bool(arr.value(row))),
        other => Value::Text(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn csv_with_quoted_thousands() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "cbecs.csv",
            "Activity,cnsperbldng\nEducation,\"1,000\"\nOffice,*\n",
        );
        let table = load_file(&path).unwrap();
        assert_eq!(table.columns(), &["activity".to_string(), "cnsperbldng".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0][1].as_measure(), Ok(Some(1000.0)));
        assert_eq!(table.rows()[1][1].as_measure(), Ok(None));
    }

    #[test]
    fn json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "eowld.json",
            r#"[{"municipal": "Testville", "avgemp": 12.5}, {"municipal": "Elsewhere"}]"#,
        );
        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        let avg = table.column_index("avgemp").unwrap();
        assert_eq!(table.rows()[0][avg], Value::Float(12.5));
        assert_eq!(table.rows()[1][avg], Value::Null);
    }

    #[test]
    fn unknown_extension_fails_before_reading() {
        let path = Path::new("/definitely/not/here/data.txt");
        let err = load_file(path).unwrap_err();
        match err.downcast_ref::<DatasetError>() {
            Some(DatasetError::UnknownFormat { extension, .. }) => assert_eq!(extension, "txt"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_csv_reports_path() {
        let err = load_file(Path::new("/definitely/not/here/data.csv")).unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here/data.csv"));
    }
}
