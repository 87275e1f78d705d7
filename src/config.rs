use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::filename::AlfFilename;
use crate::error::Result;

/// Environment variable naming the local data repository.
pub const ROOT_ENV: &str = "ALF_ROOT";

/// Where sessions live and which ALF files make up a trials table.
///
/// ```json
/// { "root": "/data/Subjects", "trials_object": "trials", "namespaces": ["ibl"] }
/// ```
/// Missing keys fall back to [`AlfConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlfConfig {
    /// Root of the `subject/date/sequence` tree.
    pub root: PathBuf,
    /// ALF object holding per-trial data.
    pub trials_object: String,
    /// Accepted namespaces. `None` accepts any namespace, or none at all.
    pub namespaces: Option<Vec<String>>,
}

impl Default for AlfConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            trials_object: "trials".to_string(),
            namespaces: None,
        }
    }
}

impl AlfConfig {
    /// Defaults with the root taken from `ALF_ROOT`, else the working directory.
    pub fn from_env() -> Self {
        let root = std::env::var_os(ROOT_ENV)
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            root,
            ..Self::default()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Whether `file` belongs to the configured trials object.
    pub fn accepts(&self, file: &AlfFilename) -> bool {
        if file.object() != self.trials_object {
            return false;
        }
        match (&self.namespaces, file.namespace()) {
            (None, _) => true,
            (Some(allowed), Some(ns)) => allowed.iter().any(|a| a == ns),
            (Some(_), None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> AlfFilename {
        AlfFilename::parse(s).unwrap()
    }

    #[test]
    fn default_accepts_any_namespace() {
        let cfg = AlfConfig::default();
        assert!(cfg.accepts(&name("trials.choice.npy")));
        assert!(cfg.accepts(&name("_ibl_trials.choice.npy")));
        assert!(cfg.accepts(&name("_lab_trials.choice.npy")));
        assert!(!cfg.accepts(&name("_ibl_wheel.position.npy")));
    }

    #[test]
    fn namespace_list_restricts_matches() {
        let cfg = AlfConfig {
            namespaces: Some(vec!["ibl".into()]),
            ..AlfConfig::default()
        };
        assert!(cfg.accepts(&name("_ibl_trials.choice.npy")));
        assert!(!cfg.accepts(&name("_lab_trials.choice.npy")));
        assert!(!cfg.accepts(&name("trials.choice.npy")));
    }

    #[test]
    fn reads_partial_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("alf.json");
        std::fs::write(&path, r#"{ "root": "/data", "namespaces": ["ibl"] }"#).unwrap();
        let cfg = AlfConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.root, PathBuf::from("/data"));
        assert_eq!(cfg.trials_object, "trials");
        assert_eq!(cfg.namespaces, Some(vec!["ibl".to_string()]));
    }

    #[test]
    fn with_root_overrides_root() {
        let cfg = AlfConfig::default().with_root("/tmp/subjects");
        assert_eq!(cfg.root, PathBuf::from("/tmp/subjects"));
    }
}
