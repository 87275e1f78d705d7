use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, UInt32Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::NumericArray;
use super::npy;
use crate::error::{AlfError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Extensions `load_array` knows how to read.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["npy", "json", "csv", "parquet", "pq"];

pub fn is_supported(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
}

/// Load the numeric payload of one ALF file.  Dispatch by extension.
///
/// Supported formats:
/// * `.npy`     – NumPy array (the usual ALF payload)
/// * `.json`    – `[1, 2, 3]` or `[[0.0, 1.2], [1.5, 2.9]]`
/// * `.csv`     – headerless, one row per line
/// * `.parquet` – every numeric column becomes one sub-column
pub fn load_array(path: &Path) -> Result<NumericArray> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "npy" => npy::read_npy(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(AlfError::UnsupportedFormat(format!(
            "{}: .{other}",
            path.display()
        ))),
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> AlfError {
    AlfError::malformed(path.display().to_string(), reason)
}

/// Stack equal-length rows into a two-dimensional array.
fn from_rows(path: &Path, rows: Vec<Vec<f64>>) -> Result<NumericArray> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if let Some(i) = rows.iter().position(|r| r.len() != width) {
        return Err(malformed(
            path,
            format!("row {i} has {} values, expected {width}", rows[i].len()),
        ));
    }
    let shape = vec![rows.len(), width];
    NumericArray::new(shape, rows.into_iter().flatten().collect())
        .ok_or_else(|| malformed(path, "ragged rows"))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn json_number(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        JsonValue::Null => Some(f64::NAN),
        _ => None,
    }
}

fn load_json(path: &Path) -> Result<NumericArray> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root
        .as_array()
        .ok_or_else(|| malformed(path, "expected top-level JSON array"))?;

    if records.iter().all(|v| !v.is_array()) {
        let values = records
            .iter()
            .enumerate()
            .map(|(i, v)| json_number(v).ok_or_else(|| malformed(path, format!("[{i}]: not a number"))))
            .collect::<Result<Vec<_>>>()?;
        return Ok(NumericArray::from_vec(values));
    }

    let rows = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let arr = rec
                .as_array()
                .ok_or_else(|| malformed(path, format!("row {i} is not an array")))?;
            arr.iter()
                .enumerate()
                .map(|(j, v)| {
                    json_number(v).ok_or_else(|| malformed(path, format!("[{i}][{j}]: not a number")))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    from_rows(path, rows)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Headerless CSV: each record is one row; a single column yields a 1-D array.
fn load_csv(path: &Path) -> Result<NumericArray> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        let row = record
            .iter()
            .enumerate()
            .map(|(j, tok)| {
                tok.parse::<f64>().map_err(|_| {
                    malformed(path, format!("row {row_no}, field {j}: '{tok}' is not a number"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }

    let array = from_rows(path, rows)?;
    Ok(if array.width() == 1 {
        array.squeeze()
    } else {
        array
    })
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

fn load_parquet(path: &Path) -> Result<NumericArray> {
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut columns: Vec<Vec<f64>> = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        if columns.is_empty() {
            columns = vec![Vec::new(); batch.num_columns()];
        }
        for (j, col) in batch.columns().iter().enumerate() {
            let values = column_to_f64(col).ok_or_else(|| {
                malformed(
                    path,
                    format!(
                        "column '{}' has non-numeric type {:?}",
                        batch.schema().field(j).name(),
                        col.data_type()
                    ),
                )
            })?;
            columns[j].extend(values);
        }
    }

    match columns.len() {
        0 => Ok(NumericArray::from_vec(Vec::new())),
        1 => Ok(NumericArray::from_vec(columns.remove(0))),
        width => {
            let rows = columns[0].len();
            let values = (0..rows)
                .flat_map(|i| columns.iter().map(move |c| c[i]))
                .collect();
            NumericArray::new(vec![rows, width], values)
                .ok_or_else(|| malformed(path, "columns differ in length"))
        }
    }
}

// -- Arrow helpers --

/// Widen a primitive Arrow column to `f64`; nulls become NaN.
fn column_to_f64(col: &Arc<dyn Array>) -> Option<Vec<f64>> {
    let any = col.as_any();
    let values = match col.data_type() {
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()?
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect(),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()?
            .iter()
            .map(|v| v.map(f64::from).unwrap_or(f64::NAN))
            .collect(),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()?
            .iter()
            .map(|v| v.map(f64::from).unwrap_or(f64::NAN))
            .collect(),
        DataType::UInt32 => any
            .downcast_ref::<UInt32Array>()?
            .iter()
            .map(|v| v.map(f64::from).unwrap_or(f64::NAN))
            .collect(),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()?
            .iter()
            .map(|v| v.map(|i| i as f64).unwrap_or(f64::NAN))
            .collect(),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()?
            .iter()
            .map(|v| match v {
                Some(true) => 1.0,
                Some(false) => 0.0,
                None => f64::NAN,
            })
            .collect(),
        _ => return None,
    };
    Some(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn dispatches_on_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("trials.choice.npy");
        npy::write_npy(&path, &NumericArray::from_vec(vec![1.0, -1.0])).unwrap();
        assert_eq!(load_array(&path).unwrap().values, vec![1.0, -1.0]);

        let bad = tmp.path().join("trials.notes.txt");
        fs::write(&bad, "hello").unwrap();
        assert!(matches!(
            load_array(&bad),
            Err(AlfError::UnsupportedFormat(_))
        ));
        assert!(is_supported("NPY"));
        assert!(!is_supported("txt"));
    }

    #[test]
    fn loads_json_vectors_and_matrices() {
        let tmp = tempfile::tempdir().unwrap();
        let flat = tmp.path().join("a.json");
        fs::write(&flat, "[1, 2.5, true, null]").unwrap();
        let a = load_array(&flat).unwrap();
        assert_eq!(a.shape, vec![4]);
        assert_eq!(&a.values[..3], &[1.0, 2.5, 1.0]);
        assert!(a.values[3].is_nan());

        let nested = tmp.path().join("b.json");
        fs::write(&nested, "[[0.0, 1.0], [1.5, 2.0]]").unwrap();
        let b = load_array(&nested).unwrap();
        assert_eq!(b.shape, vec![2, 2]);

        let ragged = tmp.path().join("c.json");
        fs::write(&ragged, "[[0.0, 1.0], [1.5]]").unwrap();
        assert!(matches!(
            load_array(&ragged),
            Err(AlfError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn loads_headerless_csv() {
        let tmp = tempfile::tempdir().unwrap();
        let single = tmp.path().join("a.csv");
        fs::write(&single, "0.1\n0.2\n0.3\n").unwrap();
        assert_eq!(load_array(&single).unwrap().shape, vec![3]);

        let pairs = tmp.path().join("b.csv");
        fs::write(&pairs, "0.0, 1.0\n1.5, 2.5\n").unwrap();
        let b = load_array(&pairs).unwrap();
        assert_eq!(b.shape, vec![2, 2]);
        assert_eq!(b.column(1), Some(vec![1.0, 2.5]));

        let junk = tmp.path().join("c.csv");
        fs::write(&junk, "abc\n").unwrap();
        assert!(load_array(&junk).is_err());
    }
}
