//! Workload overheads applied to the intrinsic FLOPs requirement, and the
//! capacity-side margin applied only when provisioning units.

use crate::config::{EfficiencyProfile, WorkloadProfile};
use serde::{Deserialize, Serialize};

/// Prompts shorter than this carry no prefill overhead
pub const PREFILL_OVERHEAD_MIN_TOKENS: f64 = 100.0;
pub const PREFILL_OVERHEAD_CAP: f64 = 0.30;

/// Sequences shorter than this carry no attention overhead
pub const ATTENTION_OVERHEAD_MIN_TOKENS: f64 = 2000.0;
pub const ATTENTION_OVERHEAD_CAP: f64 = 0.40;

/// Prefill overhead fraction
/// Formula: min(0.30, input_tokens / 1000 * 0.15), zero below 100 tokens
pub fn prefill_overhead(input_tokens: f64) -> f64 {
    if input_tokens.is_nan() || input_tokens < PREFILL_OVERHEAD_MIN_TOKENS {
        return 0.0;
    }
    (input_tokens / 1000.0 * 0.15).min(PREFILL_OVERHEAD_CAP)
}

/// Attention overhead fraction
/// Formula: min(0.40, (seq_len - 2000) / 10000 * 0.20), zero below 2000 tokens
pub fn attention_overhead(sequence_length: f64) -> f64 {
    if sequence_length.is_nan() || sequence_length < ATTENTION_OVERHEAD_MIN_TOKENS {
        return 0.0;
    }
    ((sequence_length - ATTENTION_OVERHEAD_MIN_TOKENS) / 10000.0 * 0.20).min(ATTENTION_OVERHEAD_CAP)
}

/// Resolved overhead fractions for one calculation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Overheads {
    pub prefill: f64,
    pub attention: f64,
}

impl Overheads {
    /// Use explicit fractions from the efficiency profile, deriving the
    /// missing ones from the workload's token counts
    pub fn resolve(efficiency: &EfficiencyProfile, workload: &WorkloadProfile) -> Self {
        let prefill = efficiency
            .prefill_overhead
            .unwrap_or_else(|| prefill_overhead(workload.new_input_tokens));
        let attention = efficiency
            .attention_overhead
            .unwrap_or_else(|| attention_overhead(workload.sequence_length()));

        Self {
            prefill: prefill.max(0.0),
            attention: attention.max(0.0),
        }
    }

    /// Factor applied to the per-user FLOPs demand
    pub fn factor(&self, combination: OverheadCombination) -> f64 {
        combination.factor(self.prefill, self.attention)
    }
}

/// How prefill and attention overheads combine.
///
/// `Additive` is the production engine's form. `LegacyMultiplicative`
/// reproduces the older formula family, which also folds redundancy into
/// the workload; it exists only for comparison against historical figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverheadCombination {
    Additive,
    LegacyMultiplicative { redundancy: f64 },
}

impl OverheadCombination {
    pub fn factor(&self, prefill: f64, attention: f64) -> f64 {
        match self {
            OverheadCombination::Additive => 1.0 + prefill + attention,
            OverheadCombination::LegacyMultiplicative { redundancy } => {
                (1.0 + prefill) * (1.0 + attention) * redundancy
            }
        }
    }
}

/// Redundancy on provisioned capacity, either as a direct multiplier or as
/// a fraction added on top of 1.
///
/// Accepted from config as `{ multiplier = 1.2 }`, `{ fraction = 0.2 }`, or
/// a bare number (compatibility form, interpreted by magnitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RedundancyInput", into = "RedundancyInput")]
pub enum Redundancy {
    Multiplier(f64),
    Fraction(f64),
}

impl Redundancy {
    /// Interpret a bare number: values above 1 are multipliers, anything
    /// else is a fraction converted to 1 + r
    pub fn from_ambiguous(value: f64) -> Self {
        log::warn!(
            "bare redundancy value {} interpreted by magnitude; \
             use {{ multiplier = .. }} or {{ fraction = .. }}",
            value
        );
        if value > 1.0 {
            Redundancy::Multiplier(value)
        } else {
            Redundancy::Fraction(value)
        }
    }

    /// Effective multiplier, never below 1
    pub fn multiplier(&self) -> f64 {
        let m = match *self {
            Redundancy::Multiplier(m) => m,
            Redundancy::Fraction(r) => 1.0 + r,
        };
        if m.is_finite() {
            m.max(1.0)
        } else {
            1.0
        }
    }
}

impl Default for Redundancy {
    fn default() -> Self {
        Redundancy::Multiplier(1.0)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RedundancyInput {
    Multiplier { multiplier: f64 },
    Fraction { fraction: f64 },
    Bare(f64),
}

impl From<RedundancyInput> for Redundancy {
    fn from(input: RedundancyInput) -> Self {
        match input {
            RedundancyInput::Multiplier { multiplier } => Redundancy::Multiplier(multiplier),
            RedundancyInput::Fraction { fraction } => Redundancy::Fraction(fraction),
            RedundancyInput::Bare(value) => Redundancy::from_ambiguous(value),
        }
    }
}

impl From<Redundancy> for RedundancyInput {
    fn from(redundancy: Redundancy) -> Self {
        match redundancy {
            Redundancy::Multiplier(multiplier) => RedundancyInput::Multiplier { multiplier },
            Redundancy::Fraction(fraction) => RedundancyInput::Fraction { fraction },
        }
    }
}

/// Capacity-side multiplier on the compute-bound unit count:
/// (1 + headroom) * redundancy
pub fn capacity_margin(target_headroom: f64, redundancy: Redundancy) -> f64 {
    let headroom = if target_headroom.is_finite() {
        target_headroom.max(0.0)
    } else {
        0.0
    };
    (1.0 + headroom) * redundancy.multiplier()
}
