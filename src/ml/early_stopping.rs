// ============================================================
// Layer 5 — Epoch Trend and Early Stopping
// ============================================================
// After every epoch the mean training loss is compared with the
// previous epoch's:
//
//   diff = (current − last) / current · 100
//
// and training stops as soon as diff ≥ LOSS_TOLERANCE. `last`
// starts at 100000, so the first epoch always yields a large
// negative diff and never stops.
//
// The rule halts when the loss RISES by 7 % or more relative to
// the current value; it does not look for a plateau.
//
// The loop state is a plain value: `observe` consumes the
// previous state and returns the next one. `drive_epochs` owns
// it and walks the epochs:
//
//   Idle ─► EpochRunning ─► (stop?) ─► Stopped
//                │ no
//                ▼
//           after_epoch (checkpoint, evaluate, log) ─► next epoch

/// Percentage rise that stops training.
pub const LOSS_TOLERANCE: f64 = 7.0;

/// `last_loss` before the first epoch.
pub const INITIAL_LAST_LOSS: f64 = 100000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainState {
    pub last_loss: f64,
}

impl Default for TrainState {
    fn default() -> Self {
        Self { last_loss: INITIAL_LAST_LOSS }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochTrend {
    pub diff: f64,
    pub stop: bool,
}

impl TrainState {
    pub fn observe(self, current_loss: f64) -> (EpochTrend, TrainState) {
        let diff = (current_loss - self.last_loss) / current_loss * 100.0;
        let trend = EpochTrend { diff, stop: diff >= LOSS_TOLERANCE };
        (trend, TrainState { last_loss: current_loss })
    }
}

/// How an epoch loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Every epoch ran
    Completed { epochs: usize },
    /// `epoch` tripped the tolerance; nothing after its loss ran
    Stopped { epoch: usize },
}

/// The two halves of an epoch as seen by `drive_epochs`.
pub trait EpochRunner {
    type Error;

    /// Train one epoch and return its mean loss.
    fn run_epoch(&mut self, epoch: usize) -> Result<f64, Self::Error>;

    /// Checkpoint, evaluate and log. Skipped for the epoch that stops
    /// the loop.
    fn after_epoch(&mut self, epoch: usize, loss: f64, trend: EpochTrend) -> Result<(), Self::Error>;
}

pub fn drive_epochs<R: EpochRunner>(n_epochs: usize, runner: &mut R) -> Result<LoopOutcome, R::Error> {
    let mut state = TrainState::default();
    for epoch in 0..n_epochs {
        let loss = runner.run_epoch(epoch)?;
        let (trend, next) = state.observe(loss);
        state = next;

        if trend.stop {
            tracing::info!("Early stop at epoch {}: diff {:.3} ≥ {}", epoch, trend.diff, LOSS_TOLERANCE);
            return Ok(LoopOutcome::Stopped { epoch });
        }
        runner.after_epoch(epoch, loss, trend)?;
    }
    Ok(LoopOutcome::Completed { epochs: n_epochs })
}
