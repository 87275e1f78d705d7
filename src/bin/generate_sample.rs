use std::path::PathBuf;

use alf_trials::data::npy::write_npy;
use alf_trials::{ExperimentReference, NumericArray};
use anyhow::{Context, Result};
use chrono::NaiveDate;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// Probability of a leftward choice for a signed contrast (percent).
fn p_left(contrast: f64, bias: f64) -> f64 {
    let lapse = 0.05;
    lapse + (1.0 - 2.0 * lapse) / (1.0 + ((contrast - bias) / 12.0).exp())
}

struct Session {
    contrast_left: Vec<f64>,
    contrast_right: Vec<f64>,
    choice: Vec<f64>,
    feedback: Vec<f64>,
    included: Vec<f64>,
    go_cue: Vec<f64>,
    response: Vec<f64>,
    intervals: Vec<f64>,
}

fn generate_session(n_trials: usize, bias: f64, rng: &mut SimpleRng) -> Session {
    let levels = [0.0, 0.0625, 0.125, 0.25, 0.5, 1.0];
    let mut s = Session {
        contrast_left: Vec::with_capacity(n_trials),
        contrast_right: Vec::with_capacity(n_trials),
        choice: Vec::with_capacity(n_trials),
        feedback: Vec::with_capacity(n_trials),
        included: Vec::with_capacity(n_trials),
        go_cue: Vec::with_capacity(n_trials),
        response: Vec::with_capacity(n_trials),
        intervals: Vec::with_capacity(2 * n_trials),
    };

    let mut t = 0.0;
    for _ in 0..n_trials {
        let level = *rng.pick(&levels);
        let on_right = rng.next_f64() < 0.5;
        let (left, right) = if on_right { (0.0, level) } else { (level, 0.0) };
        let contrast = (right - left) * 100.0;

        let go_cue = t + 0.5 + rng.next_f64() * 0.2;
        let no_go = rng.next_f64() < 0.03;
        let choice = if no_go {
            0.0
        } else if rng.next_f64() < p_left(contrast, bias) {
            1.0
        } else {
            -1.0
        };
        let correct = (choice == 1.0 && on_right) || (choice == -1.0 && !on_right);
        let response = go_cue + 0.2 + rng.next_f64() * 1.5;
        let end = response + if correct { 1.0 } else { 2.0 };

        s.contrast_left.push(left);
        s.contrast_right.push(right);
        s.choice.push(choice);
        s.feedback.push(if correct { 1.0 } else { -1.0 });
        s.included.push(if no_go { 0.0 } else { 1.0 });
        s.go_cue.push(go_cue);
        s.response.push(response);
        s.intervals.extend([t, end]);
        t = end + 0.5;
    }
    s
}

fn main() -> Result<()> {
    env_logger::init();

    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    let mut rng = SimpleRng::new(42);

    let sessions = [
        ("2018-09-28", 1, -10.0),
        ("2018-09-29", 1, -4.0),
        ("2018-09-30", 1, 0.0),
        ("2018-09-30", 2, 2.0),
    ];

    let mut written = 0;
    for (date, seq, bias) in sessions {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;
        let reference = ExperimentReference::new("Mouse", date, seq)?;
        let dir = reference.session_path(&root);
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        let n = 200;
        let s = generate_session(n, bias, &mut rng);
        let columns = [
            ("contrastLeft", NumericArray::from_vec(s.contrast_left)),
            ("contrastRight", NumericArray::from_vec(s.contrast_right)),
            ("choice", NumericArray::from_vec(s.choice)),
            ("feedbackType", NumericArray::from_vec(s.feedback)),
            ("included", NumericArray::from_vec(s.included)),
            ("goCue_times", NumericArray::from_vec(s.go_cue)),
            ("response_times", NumericArray::from_vec(s.response)),
        ];
        for (attribute, array) in &columns {
            write_npy(&dir.join(format!("_ibl_trials.{attribute}.npy")), array)?;
        }
        let intervals = NumericArray::new(vec![n, 2], s.intervals)
            .context("intervals shape does not match trial count")?;
        write_npy(&dir.join("_ibl_trials.intervals.npy"), &intervals)?;

        println!("{reference}: {n} trials in {}", dir.display());
        written += 1;
    }

    println!("Wrote {written} sessions under {}", root.display());
    Ok(())
}
