use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use log::{debug, warn};

use super::reference::{
    parse_date_dir, parse_sequence_dir, validate_subject, ExperimentReference, DATE_FORMAT,
};
use crate::error::{AlfError, Result};
use crate::util::flatten;

/// Experiments recorded on one date for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateExperiments {
    pub date: NaiveDate,
    /// Sequence numbers in directory enumeration order.
    pub sequences: Vec<u32>,
    /// One reference per entry of `sequences`, same order.
    pub references: Vec<ExperimentReference>,
}

/// Names of the immediate subdirectories of `dir`, in enumeration order.
/// Entries that cannot be inspected are skipped.
fn subdirectory_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => debug!("Skipping non UTF-8 directory name {raw:?}"),
        }
    }
    Ok(names)
}

/// Sequence numbers found under `subject_path/date`.
///
/// Non-numeric and zero-padded directories are ignored, so a date holding
/// none yields an empty list.
pub fn sequences_for_date(subject_path: &Path, date: NaiveDate) -> Result<Vec<u32>> {
    let date_path = subject_path.join(date.format(DATE_FORMAT).to_string());
    Ok(subdirectory_names(&date_path)?
        .iter()
        .filter_map(|name| parse_sequence_dir(name))
        .collect())
}

/// List every experiment recorded for `subject` under `root`.
///
/// No ordering is imposed beyond what the filesystem returns; sort the
/// result (or the flattened references) when chronological order matters.
pub fn list_experiments(subject: &str, root: &Path) -> Result<Vec<DateExperiments>> {
    validate_subject(subject)?;
    let subject_path = root.join(subject);
    if !subject_path.is_dir() {
        return Err(AlfError::NotFound(subject_path));
    }

    let mut listings = Vec::new();
    for name in subdirectory_names(&subject_path)? {
        let Some(date) = parse_date_dir(&name) else {
            debug!("Ignoring non-date directory {name}");
            continue;
        };
        let sequences = sequences_for_date(&subject_path, date)?;
        let references = sequences
            .iter()
            .map(|&seq| ExperimentReference::new(subject, date, seq))
            .collect::<Result<Vec<_>>>()?;
        listings.push(DateExperiments {
            date,
            sequences,
            references,
        });
    }
    Ok(listings)
}

/// All references of a listing, one level flattened.
pub fn flatten_references(listings: &[DateExperiments]) -> Vec<ExperimentReference> {
    flatten(listings.iter().map(|d| d.references.iter().cloned()))
}
