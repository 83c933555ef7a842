//! Legacy formula family.
//!
//! Older throughput estimates that apply quantization efficiency, combine
//! overheads multiplicatively and fold redundancy into the workload. Kept for
//! comparison with historical figures; `CapacityEngine::calculate` is
//! authoritative.

use super::arithmetic::{FlopsModel, ServingPattern};
use super::engine::CapacityEngine;
use super::overhead::{OverheadCombination, Overheads};
use super::{ceil_units, finite_or_zero};
use crate::config::Config;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegacyPerformance {
    pub flops_per_token: f64,
    /// peak / flops_per_token
    pub theoretical_tokens_per_sec: f64,
    /// theoretical * utilization * quantization efficiency / overhead factor
    pub realistic_tokens_per_sec: f64,
    /// (1 + prefill) * (1 + attention) * redundancy
    pub overhead_factor: f64,
}

impl<'a> CapacityEngine<'a> {
    /// Per-unit tokens/s under the legacy formulas
    pub fn calculate_performance(&self, config: &Config) -> LegacyPerformance {
        let arch = self.architecture(config);
        let flops_per_token = FlopsModel::new(&self.tables().flops, ServingPattern::Unweighted)
            .decode_flops_per_token(&config.model, &arch, config.hardware.device, None);

        let combination = OverheadCombination::LegacyMultiplicative {
            redundancy: config.efficiency.redundancy.multiplier(),
        };
        let overhead_factor =
            Overheads::resolve(&config.efficiency, &config.workload).factor(combination);

        let theoretical_tokens_per_sec = if flops_per_token > 0.0 {
            finite_or_zero(config.hardware.peak_flops / flops_per_token)
        } else {
            0.0
        };
        let quantization_efficiency = self.tables().quantization.efficiency(config.quantization);
        let realistic_tokens_per_sec = finite_or_zero(
            theoretical_tokens_per_sec * config.efficiency.utilization_factor.max(0.0)
                * quantization_efficiency
                / overhead_factor,
        );

        LegacyPerformance {
            flops_per_token,
            theoretical_tokens_per_sec,
            realistic_tokens_per_sec,
            overhead_factor,
        }
    }

    /// Reverse-infrastructure sizing: units needed for `users` at the
    /// workload's tokens/s, from legacy realistic throughput
    pub fn legacy_units_for_users(&self, config: &Config, users: u64) -> u64 {
        let performance = self.calculate_performance(config);
        if performance.realistic_tokens_per_sec <= 0.0 {
            return 0;
        }
        let demand = users as f64 * config.workload.tokens_per_sec_per_user.max(0.0);
        ceil_units(demand / performance.realistic_tokens_per_sec)
    }
}
