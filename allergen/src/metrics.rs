//! Evaluation of multi-label predictions.

use core::fmt;

use serde::Serialize;

use crate::labels::{LABELS, N_LABELS};

/// Confusion counts and scores of one label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct LabelScore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,

    /// Number of reference positives.
    pub support: usize,

    #[serde(skip)]
    pub n_tp: usize,
    #[serde(skip)]
    pub n_fp: usize,
    #[serde(skip)]
    pub n_fn: usize,
}

impl LabelScore {
    fn from_counts(n_tp: usize, n_fp: usize, n_fn: usize) -> Self {
        let precision = ratio(n_tp, n_tp + n_fp);
        let recall = ratio(n_tp, n_tp + n_fn);
        let f1 = if precision + recall > 0.0 {
            2. * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support: n_tp + n_fn,
            n_tp,
            n_fp,
            n_fn,
        }
    }
}

// 0/0 counts as 0.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Per-label precision, recall and F1 with their unweighted mean.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub macro_f1: f64,
    pub labels: Vec<(String, LabelScore)>,
}

impl EvaluationReport {
    /// Compares predictions with references.
    ///
    /// # Arguments
    ///
    /// * `references` - Gold labels of each example.
    /// * `predictions` - Predicted labels of each example, in the same order.
    pub fn new<'a, R, P>(references: R, predictions: P) -> Self
    where
        R: IntoIterator<Item = &'a [bool; N_LABELS]>,
        P: IntoIterator<Item = &'a [bool; N_LABELS]>,
    {
        let mut n_tp = [0; N_LABELS];
        let mut n_fp = [0; N_LABELS];
        let mut n_fn = [0; N_LABELS];
        for (rs, hs) in references.into_iter().zip(predictions) {
            for (i, (&r, &h)) in rs.iter().zip(hs).enumerate() {
                match (r, h) {
                    (true, true) => n_tp[i] += 1,
                    (false, true) => n_fp[i] += 1,
                    (true, false) => n_fn[i] += 1,
                    (false, false) => (),
                }
            }
        }
        let labels: Vec<_> = LABELS
            .iter()
            .enumerate()
            .map(|(i, label)| {
                (
                    label.to_string(),
                    LabelScore::from_counts(n_tp[i], n_fp[i], n_fn[i]),
                )
            })
            .collect();
        let macro_f1 = labels.iter().map(|(_, s)| s.f1).sum::<f64>() / N_LABELS as f64;
        Self { macro_f1, labels }
    }

    /// Gets the scores of one label.
    pub fn get(&self, label: &str) -> Option<&LabelScore> {
        self.labels
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, score)| score)
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (label, s) in &self.labels {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label, s.precision, s.recall, s.f1, s.support
            )?;
        }
        writeln!(f)?;
        write!(f, "{:>14} {:>29.4}", "macro F1", self.macro_f1)
    }
}
