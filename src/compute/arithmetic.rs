//! FLOPs-per-token estimation for decode and prefill

use crate::architecture::Architecture;
use crate::config::{DeviceType, ModelSpec};
use serde::{Deserialize, Serialize};

/// Context length above which decode attention cost grows past the table multiplier
pub const LONG_CONTEXT_TOKENS: f64 = 1024.0;

/// MoE blend under continuous serving: weight on active parameters
const CONTINUOUS_ACTIVE_WEIGHT: f64 = 0.05;
/// MoE blend under continuous serving: weight on total parameters
const CONTINUOUS_TOTAL_WEIGHT: f64 = 0.95;

/// FLOPs-per-parameter multipliers by model size band (<10B, <70B, <200B, >=200B)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierBands {
    pub under_10b: f64,
    pub under_70b: f64,
    pub under_200b: f64,
    pub from_200b: f64,
}

impl MultiplierBands {
    pub fn for_params(&self, params_billions: f64) -> f64 {
        if params_billions < 10.0 {
            self.under_10b
        } else if params_billions < 70.0 {
            self.under_70b
        } else if params_billions < 200.0 {
            self.under_200b
        } else {
            self.from_200b
        }
    }
}

/// Separate multiplier tables per device class. CPUs see lower multipliers
/// because their execution model carries less kernel overhead per FLOP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlopsMultipliers {
    pub gpu: MultiplierBands,
    pub cpu: MultiplierBands,
}

impl FlopsMultipliers {
    pub fn standard() -> Self {
        Self {
            gpu: MultiplierBands {
                under_10b: 2.3,
                under_70b: 3.0,
                under_200b: 4.0,
                from_200b: 5.5,
            },
            cpu: MultiplierBands {
                under_10b: 2.0,
                under_70b: 2.15,
                under_200b: 2.45,
                from_200b: 2.8,
            },
        }
    }

    pub fn bands(&self, device: DeviceType) -> &MultiplierBands {
        match device {
            DeviceType::Gpu => &self.gpu,
            DeviceType::Cpu => &self.cpu,
        }
    }

    pub fn multiplier(&self, params_billions: f64, device: DeviceType) -> f64 {
        self.bands(device).for_params(params_billions)
    }
}

impl Default for FlopsMultipliers {
    fn default() -> Self {
        Self::standard()
    }
}

/// Whether a token breakdown of continuous serving is available.
/// Changes how MoE parameters are blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServingPattern {
    /// Steady decode-dominated traffic: over time every expert's weights are touched
    Continuous,
    /// No token breakdown: plain average of active and total parameters
    Unweighted,
}

/// Parameters routed per token, in billions
/// Dense: total parameters. MoE: override if given, else total * active/total experts.
pub fn active_params(model: &ModelSpec, arch: &Architecture) -> f64 {
    if let Some(active) = model.active_params_billions {
        return active;
    }
    match arch.moe {
        Some(moe) => model.params_billions * moe.active_ratio(),
        None => model.params_billions,
    }
}

/// Parameters that drive FLOPs, in billions
/// Formula (MoE, continuous): 0.05 * active + 0.95 * total
/// Formula (MoE, unweighted): (active + total) / 2
pub fn effective_params(model: &ModelSpec, arch: &Architecture, serving: ServingPattern) -> f64 {
    if !arch.is_moe() {
        return model.params_billions;
    }

    let total = model.params_billions;
    let active = active_params(model, arch);
    match serving {
        ServingPattern::Continuous => {
            CONTINUOUS_ACTIVE_WEIGHT * active + CONTINUOUS_TOTAL_WEIGHT * total
        }
        ServingPattern::Unweighted => (active + total) / 2.0,
    }
}

/// Decode multiplier with the long-context floor applied
fn decode_multiplier(base: f64, params_billions: f64, sequence_hint: Option<f64>) -> f64 {
    let long_context = sequence_hint.is_some_and(|tokens| tokens > LONG_CONTEXT_TOKENS);
    if !long_context {
        return base;
    }
    if params_billions >= 50.0 {
        base.max(10.0)
    } else if params_billions >= 20.0 {
        base.max(8.0)
    } else {
        base
    }
}

/// FLOPs-per-token model over an injected multiplier table
pub struct FlopsModel<'a> {
    multipliers: &'a FlopsMultipliers,
    serving: ServingPattern,
}

impl<'a> FlopsModel<'a> {
    pub fn new(multipliers: &'a FlopsMultipliers, serving: ServingPattern) -> Self {
        Self {
            multipliers,
            serving,
        }
    }

    /// Decode FLOPs for one generated token
    /// Formula: multiplier(params, device) * effective_params * 1e9
    /// The multiplier is floored at 8 (>=20B) or 10 (>=50B) when the
    /// sequence hint exceeds 1024 tokens.
    pub fn decode_flops_per_token(
        &self,
        model: &ModelSpec,
        arch: &Architecture,
        device: DeviceType,
        sequence_hint: Option<f64>,
    ) -> f64 {
        let base = self.multipliers.multiplier(model.params_billions, device);
        let multiplier = decode_multiplier(base, model.params_billions, sequence_hint);
        multiplier * effective_params(model, arch, self.serving) * 1e9
    }

    /// Prefill FLOPs for one prompt token; same table, no context floor
    pub fn prefill_flops_per_token(
        &self,
        model: &ModelSpec,
        arch: &Architecture,
        device: DeviceType,
    ) -> f64 {
        let multiplier = self.multipliers.multiplier(model.params_billions, device);
        multiplier * effective_params(model, arch, self.serving) * 1e9
    }
}
