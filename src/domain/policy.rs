// ============================================================
// Layer 3 — Policy Enumerations
// ============================================================
// Every string-valued switch of the solver becomes a closed
// enum here. Parsing happens once (CLI → config), so an unknown
// name fails before any model is built, and every match over
// these types is checked for exhaustiveness by the compiler.
//
// Reference: Rust Book §6 (Enums and Pattern Matching)

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::SolverError;

/// Weight initialization scheme applied before training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitPolicy {
    /// Zero-mean Gaussian, std = gain
    Normal,
    /// Xavier/Glorot uniform, gain fixed to √2 (ReLU)
    Xavier,
    /// Kaiming uniform, fan-in mode, ReLU
    Kaiming,
    /// Orthogonal, scaled by √2
    Orthogonal,
}

impl InitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            InitPolicy::Normal     => "normal",
            InitPolicy::Xavier     => "xavier",
            InitPolicy::Kaiming    => "kaiming",
            InitPolicy::Orthogonal => "orthogonal",
        }
    }
}

impl FromStr for InitPolicy {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal"     => Ok(InitPolicy::Normal),
            "xavier"     => Ok(InitPolicy::Xavier),
            "kaiming"    => Ok(InitPolicy::Kaiming),
            "orthogonal" => Ok(InitPolicy::Orthogonal),
            other        => Err(SolverError::UnknownInitPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for InitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How per-annotator F-scores are reduced to one number.
///
/// `Max` suits datasets with several sparse ground truths (SumMe),
/// `Avg` suits datasets where every annotator is equally
/// authoritative (TVSum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMethod {
    #[default]
    Max,
    Avg,
}

impl FromStr for EvalMethod {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(EvalMethod::Max),
            "avg" => Ok(EvalMethod::Avg),
            other => Err(SolverError::UnknownEvalMethod(other.to_string())),
        }
    }
}

/// How the global attention output is combined with the local
/// (per-segment) attention output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMode {
    #[default]
    Add,
    Mult,
    Avg,
    Max,
}

impl FromStr for FusionMode {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add"  => Ok(FusionMode::Add),
            "mult" => Ok(FusionMode::Mult),
            "avg"  => Ok(FusionMode::Avg),
            "max"  => Ok(FusionMode::Max),
            other  => Err(SolverError::UnknownFusion(other.to_string())),
        }
    }
}

/// Positional information injected into the attention energies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionalEncoding {
    Absolute,
    Relative,
}

impl FromStr for PositionalEncoding {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absolute" => Ok(PositionalEncoding::Absolute),
            "relative" => Ok(PositionalEncoding::Relative),
            other      => Err(SolverError::UnknownPositionalEncoding(other.to_string())),
        }
    }
}

/// Where tensors live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// WGPU (Vulkan / Metal / DX12)
    #[default]
    Gpu,
    /// ndarray on the host
    Cpu,
}

impl FromStr for DeviceKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpu" | "cuda" | "wgpu" => Ok(DeviceKind::Gpu),
            "cpu"                   => Ok(DeviceKind::Cpu),
            other                   => Err(SolverError::UnknownDevice(other.to_string())),
        }
    }
}

/// Operating mode. Only `Train` builds an optimiser and metric logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Train,
    Test,
}
