//! Loaders for the acquisition files kept in `raw_behavior_data/`.
//!
//! These files predate the ALF convention and use fixed names. The three
//! rotary encoder logs are space-separated with no header and a trailing
//! separator on every line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AlfError, Result};

pub const RAW_DIR: &str = "raw_behavior_data";
pub const SETTINGS_FILE: &str = "_ibl_pycwBasic.settings.json";
pub const DATA_FILE: &str = "_ibl_pycwBasic.data.jsonable";
pub const ENCODER_EVENTS_FILE: &str = "_ibl_encoderEvents.bonsai_raw.csv";
pub const ENCODER_POSITIONS_FILE: &str = "_ibl_encoderPositions.bonsai_raw.csv";
pub const ENCODER_TRIAL_INFO_FILE: &str = "_ibl_encoderTrialInfo.bonsai_raw.csv";

/// State machine event seen by the rotary encoder (trial start, stim on,
/// closed loop).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderEvent {
    pub re_ts: i64,
    pub sm_ev: i64,
    pub bns_ts: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderPosition {
    pub re_ts: i64,
    pub re_pos: i64,
    pub bns_ts: DateTime<FixedOffset>,
}

/// Stimulus parameters logged once per trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderTrialInfo {
    pub trial_num: i64,
    pub stim_pos_init: i64,
    pub stim_contrast: f64,
    pub stim_freq: f64,
    /// Gabor angle, 0 = vertical.
    pub stim_angle: f64,
    /// Wheel gain in mm per degree of stimulus movement.
    pub stim_gain: f64,
    pub stim_sigma: f64,
    pub bns_ts: DateTime<FixedOffset>,
}

fn raw_path(session: &Path, file: &str) -> PathBuf {
    session.join(RAW_DIR).join(file)
}

/// Parse a Bonsai timestamp. Offset-less timestamps are taken as UTC.
pub fn parse_bonsai_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// PyBpod task settings: the JSON object on the first line of the settings file.
pub fn load_settings(session: &Path) -> Result<JsonValue> {
    let path = raw_path(session, SETTINGS_FILE);
    let mut line = String::new();
    BufReader::new(File::open(&path)?).read_line(&mut line)?;
    Ok(serde_json::from_str(&line)?)
}

/// PyBpod per-trial data, one JSON document per line.
pub fn load_data(session: &Path) -> Result<Vec<JsonValue>> {
    let path = raw_path(session, DATA_FILE);
    let reader = BufReader::new(File::open(&path)?);
    let mut trials = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        trials.push(serde_json::from_str(&line)?);
    }
    Ok(trials)
}

/// Space-separated records of a Bonsai log, each checked to hold at least
/// `min_fields` fields.
fn bonsai_records(path: &Path, min_fields: usize) -> Result<Vec<csv::StringRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() < min_fields {
            return Err(AlfError::malformed(
                path.display().to_string(),
                format!("line {line}: {} fields, expected {min_fields}", record.len()),
            ));
        }
        records.push(record);
    }
    Ok(records)
}

struct Fields<'a> {
    path: &'a Path,
    line: usize,
    record: &'a csv::StringRecord,
}

impl Fields<'_> {
    fn raw(&self, idx: usize) -> &str {
        self.record.get(idx).unwrap_or("")
    }

    fn err(&self, idx: usize, what: &str) -> AlfError {
        AlfError::malformed(
            self.path.display().to_string(),
            format!("line {}, field {idx}: '{}' is not {what}", self.line, self.raw(idx)),
        )
    }

    fn int(&self, idx: usize) -> Result<i64> {
        self.raw(idx).parse().map_err(|_| self.err(idx, "an integer"))
    }

    fn float(&self, idx: usize) -> Result<f64> {
        self.raw(idx).parse().map_err(|_| self.err(idx, "a number"))
    }

    fn timestamp(&self, idx: usize) -> Result<DateTime<FixedOffset>> {
        parse_bonsai_timestamp(self.raw(idx)).ok_or_else(|| self.err(idx, "a timestamp"))
    }
}

fn parse_log<T>(
    path: &Path,
    min_fields: usize,
    row: impl Fn(&Fields<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    bonsai_records(path, min_fields)?
        .iter()
        .enumerate()
        .map(|(line, record)| row(&Fields { path, line, record }))
        .collect()
}

/// `Event <re_ts> StateMachine <sm_ev> <bonsai_ts>`
pub fn load_encoder_events(session: &Path) -> Result<Vec<EncoderEvent>> {
    parse_log(&raw_path(session, ENCODER_EVENTS_FILE), 5, |f| {
        Ok(EncoderEvent {
            re_ts: f.int(1)?,
            sm_ev: f.int(3)?,
            bns_ts: f.timestamp(4)?,
        })
    })
}

/// `Position <re_ts> <re_pos> <bonsai_ts>`
pub fn load_encoder_positions(session: &Path) -> Result<Vec<EncoderPosition>> {
    parse_log(&raw_path(session, ENCODER_POSITIONS_FILE), 4, |f| {
        Ok(EncoderPosition {
            re_ts: f.int(1)?,
            re_pos: f.int(2)?,
            bns_ts: f.timestamp(3)?,
        })
    })
}

/// Seven stimulus fields followed by the Bonsai timestamp.
pub fn load_encoder_trial_info(session: &Path) -> Result<Vec<EncoderTrialInfo>> {
    parse_log(&raw_path(session, ENCODER_TRIAL_INFO_FILE), 8, |f| {
        Ok(EncoderTrialInfo {
            trial_num: f.int(0)?,
            stim_pos_init: f.int(1)?,
            stim_contrast: f.float(2)?,
            stim_freq: f.float(3)?,
            stim_angle: f.float(4)?,
            stim_gain: f.float(5)?,
            stim_sigma: f.float(6)?,
            bns_ts: f.timestamp(7)?,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use std::fs;

    fn session_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(RAW_DIR)).unwrap();
        for (name, body) in files {
            fs::write(tmp.path().join(RAW_DIR).join(name), body).unwrap();
        }
        tmp
    }

    #[test]
    fn parses_bonsai_timestamps() {
        let ts = parse_bonsai_timestamp("2018-07-11T11:43:17.6186368+01:00").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 3600);
        assert_eq!(ts.hour(), 11);

        let naive = parse_bonsai_timestamp("2018-07-11T11:43:17.5").unwrap();
        assert_eq!(naive.offset().local_minus_utc(), 0);

        assert!(parse_bonsai_timestamp("yesterday").is_none());
    }

    #[test]
    fn loads_settings_and_jsonable() {
        let tmp = session_with(&[
            (SETTINGS_FILE, "{\"SUBJECT_NAME\": \"Mouse\"}\n"),
            (DATA_FILE, "{\"trial_num\": 1}\n\n{\"trial_num\": 2}\n"),
        ]);
        let settings = load_settings(tmp.path()).unwrap();
        assert_eq!(settings["SUBJECT_NAME"], "Mouse");
        let data = load_data(tmp.path()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[1]["trial_num"], 2);
    }

    #[test]
    fn loads_encoder_logs() {
        let tmp = session_with(&[
            (
                ENCODER_EVENTS_FILE,
                "Event 2143 StateMachine 1 2018-07-11T11:43:17.6186368+01:00 \n\
                 Event 2201 StateMachine 2 2018-07-11T11:43:17.6781312+01:00 \n",
            ),
            (
                ENCODER_POSITIONS_FILE,
                "Position 2143 -12 2018-07-11T11:43:17.6186368+01:00 \n",
            ),
            (
                ENCODER_TRIAL_INFO_FILE,
                "1 -35 0.5 0.1 0 4 7 2018-07-11T11:43:17.6186368+01:00 \n",
            ),
        ]);

        let events = load_encoder_events(tmp.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].re_ts, 2201);
        assert_eq!(events[1].sm_ev, 2);

        let positions = load_encoder_positions(tmp.path()).unwrap();
        assert_eq!(positions[0].re_pos, -12);

        let info = load_encoder_trial_info(tmp.path()).unwrap();
        assert_eq!(info[0].trial_num, 1);
        assert_eq!(info[0].stim_pos_init, -35);
        assert!((info[0].stim_contrast - 0.5).abs() < 1e-12);
        assert!((info[0].stim_sigma - 7.0).abs() < 1e-12);
    }

    #[test]
    fn short_lines_are_malformed() {
        let tmp = session_with(&[(ENCODER_POSITIONS_FILE, "Position 2143\n")]);
        assert!(matches!(
            load_encoder_positions(tmp.path()),
            Err(AlfError::MalformedPayload { .. })
        ));
    }
}
