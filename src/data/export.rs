use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::model::TrialTable;
use crate::error::Result;

/// One `Float64` Arrow column per trial table column, in column-name order.
pub fn to_record_batch(table: &TrialTable) -> Result<RecordBatch> {
    let fields: Vec<Field> = table
        .column_names()
        .map(|name| Field::new(name, DataType::Float64, false))
        .collect();
    let arrays: Vec<ArrayRef> = table
        .columns()
        .values()
        .map(|values| Arc::new(Float64Array::from(values.clone())) as ArrayRef)
        .collect();

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Write the trial table to a Parquet file.
pub fn write_parquet(table: &TrialTable, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::loader::load_array;

    fn table() -> TrialTable {
        let mut cols = BTreeMap::new();
        cols.insert("choice".to_string(), vec![1.0, -1.0, 0.0]);
        cols.insert("contrast".to_string(), vec![-25.0, 0.0, 100.0]);
        TrialTable::from_columns(cols).unwrap()
    }

    #[test]
    fn record_batch_mirrors_table() {
        let batch = to_record_batch(&table()).unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(batch.schema().field(0).name(), "choice");
        let contrast = batch
            .column(1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(contrast.value(2), 100.0);
    }

    #[test]
    fn parquet_output_loads_back_as_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("trials.table.parquet");
        write_parquet(&table(), &path).unwrap();

        let array = load_array(&path).unwrap();
        assert_eq!(array.shape, vec![3, 2]);
        assert_eq!(array.column(0), Some(vec![1.0, -1.0, 0.0]));
        assert_eq!(array.column(1), Some(vec![-25.0, 0.0, 100.0]));
    }
}
