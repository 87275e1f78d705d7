use std::collections::BTreeMap;

use crate::error::{AlfError, Result};

// ---------------------------------------------------------------------------
// NumericArray – the payload of one ALF file
// ---------------------------------------------------------------------------

/// An n-dimensional numeric array stored row-major and widened to `f64`.
/// Booleans load as `0.0` / `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl NumericArray {
    /// Build an array, checking that `shape` accounts for every value.
    /// A zero-dimensional shape holds a single scalar.
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Option<Self> {
        let expected: usize = shape.iter().product();
        (expected == values.len()).then_some(NumericArray { shape, values })
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        NumericArray {
            shape: vec![values.len()],
            values,
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Length of the first (trial) axis; a scalar counts as one row.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Number of values per row.
    pub fn width(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Drop singleton axes after the trial axis: `(n, 1)` becomes `(n,)` and a
    /// scalar becomes `(1,)`. The trial axis itself is never removed, so a
    /// one-trial `(1, 2)` array stays two-dimensional.
    pub fn squeeze(self) -> Self {
        let shape: Vec<usize> = match self.shape.split_first() {
            Some((&rows, rest)) => std::iter::once(rows)
                .chain(rest.iter().copied().filter(|&d| d != 1))
                .collect(),
            None => vec![1],
        };
        NumericArray {
            shape,
            values: self.values,
        }
    }

    /// Values of sub-column `j` of a two-dimensional array.
    pub fn column(&self, j: usize) -> Option<Vec<f64>> {
        if self.ndim() != 2 || j >= self.shape[1] {
            return None;
        }
        let width = self.shape[1];
        Some(
            self.values
                .chunks(width)
                .map(|row| row[j])
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// TrialTable – one row per trial, one named column per attribute
// ---------------------------------------------------------------------------

/// Columns required by the psychometric, reaction-time and heatmap consumers.
pub const ANALYSIS_COLUMNS: [&str; 6] = [
    "contrast",
    "choice",
    "included",
    "feedbackType",
    "response_times",
    "goCue_times",
];

/// Tabular trial data. Every column has the same number of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialTable {
    columns: BTreeMap<String, Vec<f64>>,
    n_trials: usize,
}

impl TrialTable {
    /// Build a table, rejecting any column whose length differs from the
    /// first column's.
    pub fn from_columns(columns: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        let mut lengths = columns.iter().map(|(name, col)| (name, col.len()));
        let n_trials = match lengths.next() {
            Some((_, n)) => n,
            None => 0,
        };
        if let Some((name, found)) = lengths.find(|&(_, len)| len != n_trials) {
            return Err(AlfError::InconsistentData {
                column: name.clone(),
                expected: n_trials,
                found,
            });
        }
        Ok(TrialTable { columns, n_trials })
    }

    /// Number of trials (rows).
    pub fn len(&self) -> usize {
        self.n_trials
    }

    pub fn is_empty(&self) -> bool {
        self.n_trials == 0
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in sorted order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.columns
    }

    /// Fetch a column that a downstream consumer cannot do without.
    pub fn require(&self, name: &str) -> Result<&[f64]> {
        self.column(name)
            .ok_or_else(|| AlfError::MissingColumn(name.to_string()))
    }

    /// Check that every name in `names` is present.
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.require(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(widths: &[(&str, usize)]) -> BTreeMap<String, Vec<f64>> {
        widths
            .iter()
            .map(|(name, n)| (name.to_string(), vec![0.0; *n]))
            .collect()
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = TrialTable::from_columns(cols(&[("a", 10), ("b", 10), ("c", 9)])).unwrap_err();
        match err {
            AlfError::InconsistentData {
                column,
                expected,
                found,
            } => {
                assert_eq!(column, "c");
                assert_eq!(expected, 10);
                assert_eq!(found, 9);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn equal_lengths_build_a_table() {
        let table = TrialTable::from_columns(cols(&[("choice", 4), ("contrast", 4)])).unwrap();
        assert_eq!(table.len(), 4);
        assert!(!table.is_empty());
        assert_eq!(table.column_names().collect::<Vec<_>>(), ["choice", "contrast"]);
        assert!(table.require_columns(&["choice"]).is_ok());
        assert!(matches!(
            table.require("included"),
            Err(AlfError::MissingColumn(c)) if c == "included"
        ));
    }

    #[test]
    fn squeeze_keeps_trial_axis() {
        let a = NumericArray::new(vec![3, 1], vec![1.0, 2.0, 3.0]).unwrap().squeeze();
        assert_eq!(a.shape, vec![3]);

        let b = NumericArray::new(vec![1, 2], vec![0.5, 1.5]).unwrap().squeeze();
        assert_eq!(b.shape, vec![1, 2]);

        let scalar = NumericArray::new(vec![], vec![7.0]).unwrap().squeeze();
        assert_eq!(scalar.shape, vec![1]);
        assert_eq!(scalar.rows(), 1);
    }

    #[test]
    fn column_extracts_sub_columns() {
        let a = NumericArray::new(vec![2, 2], vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(a.column(0), Some(vec![0.0, 2.0]));
        assert_eq!(a.column(1), Some(vec![1.0, 3.0]));
        assert_eq!(a.column(2), None);
        assert_eq!(a.width(), 2);
    }

    #[test]
    fn new_rejects_shape_mismatch() {
        assert!(NumericArray::new(vec![2, 2], vec![0.0; 3]).is_none());
    }
}
