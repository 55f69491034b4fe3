//! Device and precision policy port.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Compute device a model is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
    Metal,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(index) => write!(f, "cuda:{index}"),
            Self::Metal => write!(f, "metal"),
        }
    }
}

/// Numeric precision of model weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    F32,
    F16,
    Bf16,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => write!(f, "f32"),
            Self::F16 => write!(f, "f16"),
            Self::Bf16 => write!(f, "bf16"),
        }
    }
}

/// Decides where a model runs and how its memory is reclaimed.
///
/// The orchestrator passes the answers through to the engine and never
/// interprets them.
pub trait DevicePolicy: Send + Sync {
    /// Target device for `model_id`.
    fn device_for(&self, model_id: &str) -> Device;

    /// Precision all models are cast to.
    fn precision(&self) -> Precision;

    /// Release cached allocator memory after a load or unload.
    fn reclaim_memory(&self);
}

/// Runs everything on the CPU in full precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuPolicy;

impl DevicePolicy for CpuPolicy {
    fn device_for(&self, _model_id: &str) -> Device {
        Device::Cpu
    }

    fn precision(&self) -> Precision {
        Precision::F32
    }

    fn reclaim_memory(&self) {
        tracing::trace!("CPU policy: nothing to reclaim");
    }
}
