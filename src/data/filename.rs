use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AlfError, Result};

// ---------------------------------------------------------------------------
// AlfFilename – `(_namespace_)object.attribute.extension`
// ---------------------------------------------------------------------------

/// A decomposed ALF filename.
///
/// The last two dot-separated tokens are always the attribute and the
/// extension; everything before them is the object, so `spikes.v2.times.npy`
/// has object `spikes.v2`. A leading `_<token>_` on the object is split off as
/// the namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlfFilename {
    namespace: Option<String>,
    object: String,
    attribute: String,
    extension: String,
}

fn namespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^_(?P<namespace>[A-Za-z0-9]+)_(?P<object>.+)$")
            .expect("namespace pattern is valid")
    })
}

impl AlfFilename {
    /// Decompose a bare filename (no directory components).
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = || AlfError::InvalidFilename(name.to_string());

        if name.contains('/') || name.contains('\\') {
            return Err(invalid());
        }

        let mut tail = name.rsplitn(3, '.');
        let extension = tail.next().ok_or_else(invalid)?;
        let attribute = tail.next().ok_or_else(invalid)?;
        let stem = tail.next().ok_or_else(invalid)?;
        if extension.is_empty() || attribute.is_empty() || stem.is_empty() {
            return Err(invalid());
        }

        let (namespace, object) = match namespace_pattern().captures(stem) {
            Some(caps) => (
                Some(caps["namespace"].to_string()),
                caps["object"].to_string(),
            ),
            None => (None, stem.to_string()),
        };
        // Dots inside the object are allowed, empty segments are not.
        if object.split('.').any(str::is_empty) {
            return Err(invalid());
        }

        Ok(AlfFilename {
            namespace,
            object,
            attribute: attribute.to_string(),
            extension: extension.to_string(),
        })
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Object with its namespace prefix re-attached, e.g. `_ibl_trials`.
    pub fn full_object(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("_{ns}_{}", self.object),
            None => self.object.clone(),
        }
    }
}

impl fmt::Display for AlfFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.full_object(),
            self.attribute,
            self.extension
        )
    }
}

impl FromStr for AlfFilename {
    type Err = AlfError;

    fn from_str(s: &str) -> Result<Self> {
        AlfFilename::parse(s)
    }
}

/// Whether `name` follows the ALF naming convention.
pub fn is_alf_filename(name: &str) -> bool {
    AlfFilename::parse(name).is_ok()
}

/// Decompose `name`, failing with [`AlfError::InvalidFilename`] when it is not ALF.
pub fn parse_alf_filename(name: &str) -> Result<AlfFilename> {
    AlfFilename::parse(name)
}
