// ============================================================
// Layer 3 — Summary Reconstruction
// ============================================================
// Turns per-step importance scores into a binary keyshot
// summary over the original frames:
//
//   1. Spread each step score over the frames it was sampled
//      from (picks[i] .. picks[i + 1]).
//   2. Score each shot (change-point segment) by the mean of
//      its frame scores.
//   3. Pick the set of shots with the highest total score whose
//      total length fits in 15 % of the video (0/1 knapsack).
//   4. Mark every frame of the picked shots with 1.
//
// Reference: Zhang et al. (2016), Gygli et al. (2014)
//            Rust Book §8 (Vectors)

/// Fraction of the video the summary may cover.
pub const SUMMARY_BUDGET: f64 = 0.15;

/// Build a 0/1 summary of length `last_change_point.end + 1`.
pub fn generate_summary(
    change_points: &[[usize; 2]],
    scores:        &[f32],
    n_frames:      usize,
    picks:         &[usize],
) -> Vec<u8> {
    let Some(last_shot) = change_points.last() else {
        return Vec::new();
    };

    let frame_scores = upsample_scores(scores, n_frames, picks);

    // ── Shot lengths and mean importance ──────────────────────────────────────
    let mut shot_lengths = Vec::with_capacity(change_points.len());
    let mut shot_scores  = Vec::with_capacity(change_points.len());
    for &[start, end] in change_points {
        shot_lengths.push(end + 1 - start.min(end + 1));
        let lo = start.min(frame_scores.len());
        let hi = (end + 1).min(frame_scores.len()).max(lo);
        let slice = &frame_scores[lo..hi];
        let mean = if slice.is_empty() {
            0.0
        } else {
            slice.iter().sum::<f64>() / slice.len() as f64
        };
        shot_scores.push(mean);
    }

    let summary_len = last_shot[1] + 1;
    let capacity    = (summary_len as f64 * SUMMARY_BUDGET) as usize;
    let selected    = knapsack(capacity, &shot_lengths, &shot_scores);

    let mut summary = vec![0u8; summary_len];
    for shot in selected {
        let [start, end] = change_points[shot];
        for frame in summary.iter_mut().take(end + 1).skip(start) {
            *frame = 1;
        }
    }
    summary
}

/// Expand step scores to one score per frame. Frames after the last
/// scored step keep 0.
fn upsample_scores(scores: &[f32], n_frames: usize, picks: &[usize]) -> Vec<f64> {
    let mut positions = picks.to_vec();
    if positions.last() != Some(&n_frames) {
        positions.push(n_frames);
    }

    let mut frame_scores = vec![0.0f64; n_frames];
    for (i, window) in positions.windows(2).enumerate() {
        let left  = window[0].min(n_frames);
        let right = window[1].min(n_frames).max(left);
        let value = scores.get(i).copied().map_or(0.0, f64::from);
        frame_scores[left..right].fill(value);
    }
    frame_scores
}

/// 0/1 knapsack. Returns the indices of the chosen items in
/// ascending order.
pub fn knapsack(capacity: usize, weights: &[usize], values: &[f64]) -> Vec<usize> {
    let n     = weights.len().min(values.len());
    let width = capacity + 1;
    // table[i * width + w] = best value using the first i items within weight w
    let mut table = vec![0.0f64; (n + 1) * width];

    for i in 1..=n {
        let (wt, val) = (weights[i - 1], values[i - 1]);
        for w in 1..=capacity {
            let skip = table[(i - 1) * width + w];
            table[i * width + w] = if wt <= w {
                skip.max(val + table[(i - 1) * width + w - wt])
            } else {
                skip
            };
        }
    }

    let mut selected = Vec::new();
    let mut w = capacity;
    for i in (1..=n).rev() {
        if table[i * width + w] != table[(i - 1) * width + w] {
            selected.push(i - 1);
            w -= weights[i - 1];
        }
    }
    selected.reverse();
    selected
}
