// ============================================================
// Layer 3 — Summary F-score
// ============================================================
// Compares a predicted 0/1 keyframe selection against one or
// more human selections.
//
//   S = predicted, zero-padded to max_len
//   G = one annotator row, zero-padded to max_len
//   overlap   = |S ∧ G|
//   precision = overlap / |S|
//   recall    = overlap / |G|
//   F         = 2·P·R / (P + R) · 100
//
// Positions missing from the shorter vector count as "not
// selected". The function is total: 0/0 is taken as 0, so an
// empty prediction scores 0 instead of NaN.
//
// Reference: Zhang et al. (2016) Video Summarization with LSTM
//            (keyshot F-score protocol)

use crate::domain::policy::EvalMethod;

/// Reduced F-score in [0, 100].
pub fn evaluate_summary<S, G>(predicted: &[S], user_summary: &[G], method: EvalMethod) -> f64
where
    S: Copy + Into<f64>,
    G: AsRef<[u8]>,
{
    let width   = user_summary.iter().map(|u| u.as_ref().len()).max().unwrap_or(0);
    let max_len = predicted.len().max(width);

    let mut s = vec![false; max_len];
    for (slot, &v) in s.iter_mut().zip(predicted) {
        *slot = v.into() != 0.0;
    }
    let s_count = s.iter().filter(|&&b| b).count();

    let f_scores: Vec<f64> = user_summary
        .iter()
        .map(|user| {
            let user = user.as_ref();
            let mut g = vec![false; max_len];
            for (slot, &v) in g.iter_mut().zip(user) {
                *slot = v != 0;
            }
            let g_count = g.iter().filter(|&&b| b).count();
            let overlap = s.iter().zip(&g).filter(|&(&a, &b)| a && b).count();
            f_score(overlap, s_count, g_count)
        })
        .collect();

    if f_scores.is_empty() {
        return 0.0;
    }
    match method {
        EvalMethod::Max => f_scores.iter().copied().fold(f64::MIN, f64::max),
        EvalMethod::Avg => f_scores.iter().sum::<f64>() / f_scores.len() as f64,
    }
}

fn f_score(overlap: usize, predicted: usize, truth: usize) -> f64 {
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = ratio(overlap, predicted);
    let recall    = ratio(overlap, truth);
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall * 100.0 / (precision + recall)
    }
}

/// Mean of the finite values; 0 when there are none.
pub fn mean_finite(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        0.0
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    }
}
