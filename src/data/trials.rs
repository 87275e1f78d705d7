use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::filename::AlfFilename;
use super::loader::{is_supported, load_array};
use super::model::{NumericArray, TrialTable};
use super::reference::ExperimentReference;
use crate::config::AlfConfig;
use crate::error::{AlfError, Result};
use crate::util::timed;

/// ALF files in `session` that belong to the configured trials object,
/// sorted by filename. Later files repeating an attribute are dropped.
pub fn discover_trial_files(
    session: &Path,
    config: &AlfConfig,
) -> Result<Vec<(AlfFilename, PathBuf)>> {
    if !session.is_dir() {
        return Err(AlfError::NotFound(session.to_path_buf()));
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(session)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let Ok(alf) = AlfFilename::parse(&name) else {
            continue;
        };
        if !config.accepts(&alf) {
            continue;
        }
        if !is_supported(alf.extension()) {
            debug!("Skipping {name}: no loader for .{}", alf.extension());
            continue;
        }
        found.push((name, alf, entry.path()));
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));

    let mut seen = BTreeSet::new();
    let mut files = Vec::with_capacity(found.len());
    for (name, alf, path) in found {
        if !seen.insert(alf.attribute().to_string()) {
            warn!("Skipping {name}: attribute '{}' already loaded", alf.attribute());
            continue;
        }
        files.push((alf, path));
    }
    Ok(files)
}

/// Insert a column computed from other columns, replacing any file column
/// of the same name.
fn insert_derived(table: &mut BTreeMap<String, Vec<f64>>, name: &str, values: Vec<f64>) {
    if table.insert(name.to_string(), values).is_some() {
        warn!("Derived column '{name}' replaces the loaded column of the same name");
    }
}

/// Merge loaded attribute arrays into a [`TrialTable`].
///
/// All arrays must agree on their trial count. A two-column `intervals` array
/// becomes `trialStart` / `trialEnd`, and `contrast` is derived as
/// `(contrastRight - contrastLeft) * 100` when both sides are present.
/// Derived columns take precedence over loaded ones.
pub fn assemble(columns: Vec<(String, NumericArray)>) -> Result<TrialTable> {
    let columns: Vec<(String, NumericArray)> = columns
        .into_iter()
        .map(|(name, array)| (name, array.squeeze()))
        .collect();

    if let Some((_, first)) = columns.first() {
        let expected = first.rows();
        if let Some((name, array)) = columns.iter().find(|(_, a)| a.rows() != expected) {
            return Err(AlfError::InconsistentData {
                column: name.clone(),
                expected,
                found: array.rows(),
            });
        }
    }

    let mut table: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut bounds = None;
    for (name, array) in columns {
        if array.ndim() == 1 {
            table.insert(name, array.values);
        } else if name == "intervals" && array.ndim() == 2 && array.width() == 2 {
            bounds = array.column(0).zip(array.column(1));
        } else {
            return Err(AlfError::malformed(
                name,
                format!("expected one value per trial, got shape {:?}", array.shape),
            ));
        }
    }

    if let Some((start, end)) = bounds {
        insert_derived(&mut table, "trialStart", start);
        insert_derived(&mut table, "trialEnd", end);
    }

    let contrast: Option<Vec<f64>> = match (table.get("contrastLeft"), table.get("contrastRight")) {
        (Some(left), Some(right)) => Some(
            right
                .iter()
                .zip(left)
                .map(|(r, l)| (r - l) * 100.0)
                .collect(),
        ),
        _ => None,
    };
    if let Some(contrast) = contrast {
        insert_derived(&mut table, "contrast", contrast);
    }

    TrialTable::from_columns(table)
}

/// Load the trials table stored directly in `session`.
///
/// Returns `Ok(None)` when the directory holds no trials files.
pub fn load_session(session: &Path, config: &AlfConfig) -> Result<Option<TrialTable>> {
    let files = discover_trial_files(session, config)?;
    if files.is_empty() {
        info!("{}: nothing to process", session.display());
        return Ok(None);
    }

    let columns = files
        .into_iter()
        .map(|(alf, path)| {
            debug!("Loading {}", path.display());
            let array = timed(&format!("load {alf}"), || load_array(&path))?;
            Ok((alf.attribute().to_string(), array))
        })
        .collect::<Result<Vec<_>>>()?;

    assemble(columns).map(Some)
}

/// Load the trials table for `reference` under the configured root.
pub fn load_trial_table_with(
    reference: &ExperimentReference,
    config: &AlfConfig,
) -> Result<Option<TrialTable>> {
    let session = reference.session_path(&config.root);
    timed(&format!("load_trial_table {reference}"), || {
        load_session(&session, config)
    })
}

/// Load the trials table for `reference` under `root` with default object rules.
///
/// `Ok(None)` signals a session without trials data; check it before use.
pub fn load_trial_table(reference: &ExperimentReference, root: &Path) -> Result<Option<TrialTable>> {
    load_trial_table_with(reference, &AlfConfig::default().with_root(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, values: &[f64]) -> (String, NumericArray) {
        (name.to_string(), NumericArray::from_vec(values.to_vec()))
    }

    #[test]
    fn derives_contrast() {
        let table = assemble(vec![col("contrastLeft", &[0.2]), col("contrastRight", &[0.5])]).unwrap();
        let contrast = table.column("contrast").unwrap();
        assert!((contrast[0] - 30.0).abs() < 1e-9);
        assert!(table.contains("contrastLeft"));
    }

    #[test]
    fn splits_intervals() {
        let intervals = NumericArray::new(vec![2, 2], vec![0.0, 1.0, 2.0, 3.5]).unwrap();
        let table = assemble(vec![
            ("intervals".to_string(), intervals),
            col("choice", &[1.0, -1.0]),
        ])
        .unwrap();
        assert!(!table.contains("intervals"));
        assert_eq!(table.column("trialStart"), Some(&[0.0, 2.0][..]));
        assert_eq!(table.column("trialEnd"), Some(&[1.0, 3.5][..]));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn column_vectors_are_squeezed() {
        let choice = NumericArray::new(vec![3, 1], vec![1.0, -1.0, 0.0]).unwrap();
        let table = assemble(vec![("choice".to_string(), choice)]).unwrap();
        assert_eq!(table.column("choice"), Some(&[1.0, -1.0, 0.0][..]));
    }

    #[test]
    fn mismatched_rows_fail() {
        let err = assemble(vec![
            col("a", &[0.0; 10]),
            col("b", &[0.0; 10]),
            col("c", &[0.0; 9]),
        ])
        .unwrap_err();
        assert!(matches!(err, AlfError::InconsistentData { found: 9, .. }));
    }

    #[test]
    fn derived_columns_replace_loaded_ones() {
        let intervals = NumericArray::new(vec![2, 2], vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let table = assemble(vec![
            col("contrast", &[7.0, 7.0]),
            col("contrastLeft", &[0.0, 0.5]),
            col("contrastRight", &[0.25, 0.0]),
            ("intervals".to_string(), intervals),
            col("trialEnd", &[9.0, 9.0]),
            col("trialStart", &[9.0, 9.0]),
        ])
        .unwrap();
        assert_eq!(table.column("trialStart"), Some(&[0.0, 2.0][..]));
        assert_eq!(table.column("trialEnd"), Some(&[1.0, 3.0][..]));
        assert_eq!(table.column("contrast"), Some(&[25.0, -50.0][..]));
    }

    #[test]
    fn wide_non_interval_columns_fail() {
        let wide = NumericArray::new(vec![2, 3], vec![0.0; 6]).unwrap();
        let err = assemble(vec![("intervals".to_string(), wide)]).unwrap_err();
        assert!(matches!(err, AlfError::MalformedPayload { .. }));
    }
}
