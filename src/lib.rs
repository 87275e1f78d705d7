//! Parsing of ALF filenames (`_namespace_object.attribute.extension`),
//! experiment reference addressing (`YYYY-MM-DD_N_SUBJECT` ↔
//! `root/subject/date/N`) and per-session trial table assembly.

pub mod config;
pub mod data;
pub mod error;
pub mod util;

pub use config::AlfConfig;
pub use data::filename::{is_alf_filename, parse_alf_filename, AlfFilename};
pub use data::listing::{list_experiments, DateExperiments};
pub use data::model::{NumericArray, TrialTable};
pub use data::reference::{format_reference, parse_reference, resolve_path, ExperimentReference};
pub use data::trials::{load_trial_table, load_trial_table_with};
pub use error::{AlfError, Result};
