use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AlfError, Result};

/// Date format used both in reference strings and as directory names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// ExperimentReference – `YYYY-MM-DD_N_SUBJECT`
// ---------------------------------------------------------------------------

/// Addresses one session: the `sequence`-th experiment on `date` for `subject`.
///
/// Field order gives the derived `Ord` chronological meaning: date first, then
/// sequence, then subject. Serialized as the reference string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExperimentReference {
    date: NaiveDate,
    sequence: u32,
    subject: String,
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<date>\d{4}-\d{2}-\d{2})_(?P<sequence>\d+)_(?P<subject>.+)$")
            .expect("reference pattern is valid")
    })
}

/// A subject names a single directory under the root.
pub(crate) fn validate_subject(subject: &str) -> Result<()> {
    if subject.is_empty()
        || subject == "."
        || subject == ".."
        || subject.contains('/')
        || subject.contains('\\')
        || subject.chars().any(char::is_control)
    {
        return Err(AlfError::InvalidReference(format!(
            "subject {subject:?} is not a valid directory name"
        )));
    }
    Ok(())
}

impl ExperimentReference {
    pub fn new(subject: impl Into<String>, date: NaiveDate, sequence: u32) -> Result<Self> {
        let subject = subject.into();
        validate_subject(&subject)?;
        if !(0..=9999).contains(&date.year()) {
            return Err(AlfError::InvalidReference(format!(
                "date {date} does not fit YYYY-MM-DD"
            )));
        }
        Ok(ExperimentReference {
            date,
            sequence,
            subject,
        })
    }

    /// Parse `YYYY-MM-DD_N_SUBJECT`. The subject is everything after the
    /// second underscore and may itself contain underscores.
    pub fn parse(reference: &str) -> Result<Self> {
        let caps = reference_pattern()
            .captures(reference)
            .ok_or_else(|| AlfError::InvalidReference(reference.to_string()))?;

        let date = parse_date_dir(&caps["date"]).ok_or_else(|| {
            AlfError::InvalidReference(format!("{reference}: not a calendar date"))
        })?;
        let sequence = caps["sequence"].parse::<u32>().map_err(|_| {
            AlfError::InvalidReference(format!("{reference}: sequence out of range"))
        })?;

        ExperimentReference::new(&caps["subject"], date, sequence)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// `root/subject/YYYY-MM-DD/N`. Pure path composition.
    pub fn session_path(&self, root: &Path) -> PathBuf {
        root.join(&self.subject)
            .join(self.date.format(DATE_FORMAT).to_string())
            .join(self.sequence.to_string())
    }
}

impl fmt::Display for ExperimentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.date.format(DATE_FORMAT),
            self.sequence,
            self.subject
        )
    }
}

impl FromStr for ExperimentReference {
    type Err = AlfError;

    fn from_str(s: &str) -> Result<Self> {
        ExperimentReference::parse(s)
    }
}

impl TryFrom<String> for ExperimentReference {
    type Error = AlfError;

    fn try_from(s: String) -> Result<Self> {
        ExperimentReference::parse(&s)
    }
}

impl From<ExperimentReference> for String {
    fn from(reference: ExperimentReference) -> String {
        reference.to_string()
    }
}

pub fn parse_reference(reference: &str) -> Result<ExperimentReference> {
    ExperimentReference::parse(reference)
}

pub fn format_reference(reference: &ExperimentReference) -> String {
    reference.to_string()
}

pub fn resolve_path(reference: &ExperimentReference, root: &Path) -> PathBuf {
    reference.session_path(root)
}

/// Strict `YYYY-MM-DD` match; chrono alone would also accept `2018-9-3`.
pub fn parse_date_dir(name: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(name, DATE_FORMAT).ok()?;
    (date.format(DATE_FORMAT).to_string() == name).then_some(date)
}

/// A sequence directory name is a canonical non-negative integer literal:
/// `0`, or digits without a leading zero, so it resolves back to itself.
pub fn parse_sequence_dir(name: &str) -> Option<u32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if name.len() > 1 && name.starts_with('0') {
        return None;
    }
    name.parse().ok()
}
