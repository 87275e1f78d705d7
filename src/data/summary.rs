use super::model::TrialTable;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Per-contrast performance
// ---------------------------------------------------------------------------

/// Signed contrasts (percent) of the standard task, highest-left to highest-right.
pub const DEFAULT_CONTRASTS: [f64; 11] = [
    -100.0, -50.0, -25.0, -12.5, -0.06, 0.0, 0.06, 12.5, 25.0, 50.0, 100.0,
];

/// Choice code for a leftward wheel turn; rightward turns are `-1`.
pub const CHOICE_LEFT: f64 = 1.0;
pub const CHOICE_RIGHT: f64 = -1.0;

/// One point of a psychometric curve, ready for an external fitter.
#[derive(Debug, Clone, PartialEq)]
pub struct ContrastPoint {
    pub contrast: f64,
    /// Included trials at this contrast.
    pub n: usize,
    /// Proportion of those trials with the requested choice.
    pub proportion: f64,
    /// Half-width of the normal-approximation 95% interval.
    pub ci95: f64,
}

/// Indices of trials flagged as included.
pub fn included_indices(table: &TrialTable) -> Result<Vec<usize>> {
    let included = table.require("included")?;
    Ok(included
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v != 0.0 && !v.is_nan())
        .map(|(i, _)| i)
        .collect())
}

/// `(included trials, trials with choice == choice)` at `contrast`.
fn counts_at(
    table: &TrialTable,
    included: &[usize],
    contrast: f64,
    choice: f64,
) -> Result<(usize, usize)> {
    let contrasts = table.require("contrast")?;
    let choices = table.require("choice")?;
    let at: Vec<usize> = included
        .iter()
        .copied()
        .filter(|&i| contrasts[i] == contrast)
        .collect();
    let hits = at.iter().filter(|&&i| choices[i] == choice).count();
    Ok((at.len(), hits))
}

/// Proportion of included trials at each contrast whose choice equals
/// `choice`. `None` marks contrasts with no included trials.
pub fn perf_per_contrast(
    table: &TrialTable,
    contrasts: &[f64],
    choice: f64,
) -> Result<Vec<Option<f64>>> {
    let included = included_indices(table)?;
    contrasts
        .iter()
        .map(|&c| {
            let (n, hits) = counts_at(table, &included, c, choice)?;
            Ok((n > 0).then(|| hits as f64 / n as f64))
        })
        .collect()
}

/// One [`perf_per_contrast`] row per session, for a performance heatmap.
pub fn performance_matrix(
    tables: &[TrialTable],
    contrasts: &[f64],
    choice: f64,
) -> Result<Vec<Vec<Option<f64>>>> {
    tables
        .iter()
        .map(|t| perf_per_contrast(t, contrasts, choice))
        .collect()
}

/// Psychometric points over the distinct contrasts present in the table,
/// in ascending order. Contrasts seen only on excluded trials are omitted.
pub fn psychometric_points(table: &TrialTable, choice: f64) -> Result<Vec<ContrastPoint>> {
    let included = included_indices(table)?;
    let contrasts = table.require("contrast")?;

    let mut levels: Vec<f64> = included
        .iter()
        .map(|&i| contrasts[i])
        .filter(|c| !c.is_nan())
        .collect();
    levels.sort_by(f64::total_cmp);
    levels.dedup();

    levels
        .into_iter()
        .map(|contrast| {
            let (n, hits) = counts_at(table, &included, contrast, choice)?;
            let proportion = hits as f64 / n as f64;
            let ci95 = 1.96 * (proportion * (1.0 - proportion) / n as f64).sqrt();
            Ok(ContrastPoint {
                contrast,
                n,
                proportion,
                ci95,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Response times
// ---------------------------------------------------------------------------

/// Outcome category used to colour and mark response-time scatter points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseClass {
    LeftCorrect,
    LeftIncorrect,
    RightCorrect,
    RightIncorrect,
    /// No-go trials or unknown feedback.
    Other,
}

/// Time from go cue to response, per trial.
pub fn reaction_times(table: &TrialTable) -> Result<Vec<f64>> {
    let response = table.require("response_times")?;
    let go_cue = table.require("goCue_times")?;
    Ok(response.iter().zip(go_cue).map(|(r, g)| r - g).collect())
}

/// Classify every trial by choice side and feedback.
pub fn classify_responses(table: &TrialTable) -> Result<Vec<ResponseClass>> {
    let choices = table.require("choice")?;
    let feedback = table.require("feedbackType")?;
    Ok(choices
        .iter()
        .zip(feedback)
        .map(|(&c, &f)| {
            let correct = f == 1.0;
            let incorrect = f == -1.0;
            if c == CHOICE_LEFT && correct {
                ResponseClass::LeftCorrect
            } else if c == CHOICE_LEFT && incorrect {
                ResponseClass::LeftIncorrect
            } else if c == CHOICE_RIGHT && correct {
                ResponseClass::RightCorrect
            } else if c == CHOICE_RIGHT && incorrect {
                ResponseClass::RightIncorrect
            } else {
                ResponseClass::Other
            }
        })
        .collect())
}
