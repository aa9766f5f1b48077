// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and all
// their flags.
//
// Policy flags (init_type, fusion, pos_enc, eval_method, device)
// arrive as plain strings and are parsed into their enums when
// the arguments are converted to a TrainConfig, so an unknown
// name fails with the domain error before anything is loaded.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{evaluate_use_case::EvalOverrides, train_use_case::TrainConfig};
use crate::domain::{error::SolverError, policy::Mode};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train PGL-SUM on an annotated video dataset
    Train(TrainArgs),

    /// Score a trained checkpoint on its held-out split
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON dataset keyed by video_<index>
    #[arg(long)]
    pub dataset: String,

    /// Optional JSON splits file (array of {train_keys, test_keys})
    #[arg(long)]
    pub splits: Option<String>,

    /// Which fold of the splits file to use
    #[arg(long, default_value_t = 0)]
    pub split_index: usize,

    /// Training share when no splits file is given
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    #[arg(long, default_value = "checkpoints")]
    pub save_dir: String,

    #[arg(long, default_value = "logs")]
    pub log_dir: String,

    #[arg(long, default_value = "scores")]
    pub score_dir: String,

    #[arg(long, default_value_t = 12345)]
    pub seed: u64,

    /// gpu (WGPU) or cpu (ndarray)
    #[arg(long, default_value = "gpu")]
    pub device: String,

    /// Feature size of every frame
    #[arg(long, default_value_t = 1024)]
    pub input_size: usize,

    /// Number of local-attention segments; 0 disables local attention
    #[arg(long, default_value_t = 4)]
    pub n_segments: usize,

    /// Heads of the global attention (input_size must divide evenly)
    #[arg(long, default_value_t = 8)]
    pub heads: usize,

    /// add | mult | avg | max
    #[arg(long, default_value = "add")]
    pub fusion: String,

    /// absolute | relative | none
    #[arg(long, default_value = "absolute")]
    pub pos_enc: String,

    /// normal | xavier | kaiming | orthogonal | none
    #[arg(long, default_value = "xavier")]
    pub init_type: String,

    /// Standard deviation for `normal` initialization
    #[arg(long, default_value_t = std::f64::consts::SQRT_2)]
    pub init_gain: f64,

    #[arg(long, default_value_t = 5e-5)]
    pub lr: f64,

    /// L2 weight decay
    #[arg(long, default_value_t = 1e-5)]
    pub l2_req: f64,

    #[arg(long, default_value_t = 200)]
    pub n_epochs: usize,

    /// Videos whose gradients are summed before one optimiser step
    #[arg(long, default_value_t = 20)]
    pub batch_size: usize,

    /// Maximum global gradient norm
    #[arg(long, default_value_t = 5.0)]
    pub clip: f64,

    /// max | avg
    #[arg(long, default_value = "max")]
    pub eval_method: String,

    /// Log every video's loss at info level
    #[arg(long)]
    pub verbose: bool,

    /// Also export attention matrices of the test videos
    #[arg(long)]
    pub save_weights: bool,
}

/// `"none"` disables an optional policy.
fn optional<T>(value: &str) -> Result<Option<T>, SolverError>
where
    T: std::str::FromStr<Err = SolverError>,
{
    match value {
        "none" => Ok(None),
        other  => other.parse().map(Some),
    }
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl TryFrom<TrainArgs> for TrainConfig {
    type Error = SolverError;

    fn try_from(a: TrainArgs) -> Result<Self, Self::Error> {
        Ok(TrainConfig {
            mode:           Mode::Train,
            dataset_path:   a.dataset,
            splits_path:    a.splits,
            split_index:    a.split_index,
            train_fraction: a.train_fraction,
            save_dir:       a.save_dir,
            log_dir:        a.log_dir,
            score_dir:      a.score_dir,
            seed:           a.seed,
            device:         a.device.parse()?,
            input_size:     a.input_size,
            n_segments:     (a.n_segments > 0).then_some(a.n_segments),
            heads:          a.heads,
            fusion:         a.fusion.parse()?,
            pos_enc:        optional(&a.pos_enc)?,
            init_type:      optional(&a.init_type)?,
            init_gain:      a.init_gain,
            lr:             a.lr,
            l2_req:         a.l2_req,
            n_epochs:       a.n_epochs,
            batch_size:     a.batch_size,
            clip:           a.clip,
            eval_method:    a.eval_method.parse()?,
            verbose:        a.verbose,
            save_weights:   a.save_weights,
        })
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory written by `train` (weights + train_config.json)
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Override the saved evaluation method (max | avg)
    #[arg(long)]
    pub eval_method: Option<String>,

    /// Override the saved device (gpu | cpu)
    #[arg(long)]
    pub device: Option<String>,

    /// Override where scores are written
    #[arg(long)]
    pub score_dir: Option<String>,

    #[arg(long)]
    pub save_weights: bool,
}

impl TryFrom<&EvaluateArgs> for EvalOverrides {
    type Error = SolverError;

    fn try_from(a: &EvaluateArgs) -> Result<Self, Self::Error> {
        Ok(EvalOverrides {
            eval_method:  a.eval_method.as_deref().map(str::parse).transpose()?,
            device:       a.device.as_deref().map(str::parse).transpose()?,
            score_dir:    a.score_dir.clone(),
            save_weights: a.save_weights,
        })
    }
}
