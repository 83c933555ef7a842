//! CPU sizing path.
//!
//! CPUs are rated by achievable tokens/s per socket rather than by inverting
//! a peak-FLOPs ratio, and the KV cache always lives in system RAM.

use super::arithmetic::{FlopsModel, ServingPattern};
use super::engine::CapacityEngine;
use super::{ceil_units, finite_or_zero, floor_users, UNBOUNDED_USERS};
use crate::config::{Config, CoreRequest, DeviceType, Mode};
use crate::kv_cache::{self, KvCacheUsage};
use crate::report::{Bottleneck, CpuSizingResult};

/// Per-CPU throughput figures shared by both directions of the CPU chain
#[derive(Debug, Clone, Copy)]
struct CpuRate {
    flops_per_token: f64,
    usable_flops_per_cpu: f64,
    target_tps_per_cpu: f64,
    prefill_multiplier: f64,
    redundancy: f64,
}

impl CpuRate {
    /// Fractional CPUs per user once prefill and redundancy are applied.
    /// Only meaningful for a positive target rate.
    fn cpus_per_user(&self, tokens_per_sec_per_user: f64) -> f64 {
        tokens_per_sec_per_user.max(0.0) / self.target_tps_per_cpu
            * self.prefill_multiplier
            * self.redundancy
    }
}

impl<'a> CapacityEngine<'a> {
    fn cpu_rate(&self, config: &Config) -> CpuRate {
        let arch = self.architecture(config);
        let cpu = &config.cpu;

        // Long context is charged through the prefill multiplier here, not the decode floor
        let flops_per_token = FlopsModel::new(&self.tables().flops, ServingPattern::Continuous)
            .decode_flops_per_token(&config.model, &arch, DeviceType::Cpu, None);

        // Formula: peak * amx_efficiency * utilization_target / flops_per_token
        let usable_flops_per_cpu =
            finite_or_zero(config.hardware.peak_flops * cpu.amx_efficiency.max(0.0));
        let target_tps_per_cpu = if flops_per_token > 0.0 {
            finite_or_zero(
                usable_flops_per_cpu * cpu.utilization_target.max(0.0) / flops_per_token,
            )
        } else {
            0.0
        };

        CpuRate {
            flops_per_token,
            usable_flops_per_cpu,
            target_tps_per_cpu,
            // A penalty, never a discount
            prefill_multiplier: cpu.prefill_multiplier.max(1.0),
            redundancy: cpu.redundancy.multiplier(),
        }
    }

    /// Users a fixed number of CPUs can serve.
    /// No usable rate serves nobody; no per-user demand is unbounded.
    pub fn max_users_for_cpus(&self, config: &Config, cpus: u64) -> u64 {
        let rate = self.cpu_rate(config);
        if rate.target_tps_per_cpu <= 0.0 {
            return 0;
        }
        let per_user = rate.cpus_per_user(config.workload.tokens_per_sec_per_user);
        if per_user <= 0.0 {
            return UNBOUNDED_USERS;
        }
        floor_users(cpus as f64 / per_user)
    }

    /// Model weights resident in RAM, GB.
    /// Formula: params_billions * model_ram_overhead_factor, where the factor
    /// defaults to bytes_per_param * 1.2
    pub fn cpu_model_ram_gb(&self, config: &Config) -> f64 {
        let factor = config
            .cpu
            .model_ram_overhead_factor
            .filter(|factor| factor.is_finite() && *factor > 0.0)
            .unwrap_or_else(|| {
                self.tables().quantization.bytes_per_param(config.quantization)
                    * kv_cache::memory::ACTIVATION_HEADROOM
            });
        config.model.params_billions.max(0.0) * factor
    }

    fn cpu_kv_cache(&self, config: &Config, kv_bytes_per_token: f64, users: u64) -> KvCacheUsage {
        let workload = &config.workload;
        if workload.kv_offload_ratio > 0.0 {
            log::debug!(
                "kv_offload_ratio {} ignored on CPU hardware",
                workload.kv_offload_ratio
            );
        }
        kv_cache::total_kv_cache(
            users as f64,
            workload.session_tokens(),
            kv_bytes_per_token,
            workload.active_fraction(),
            0.0,
        )
    }

    /// CPU sizing in whichever mode the request selects
    pub fn size_cpus(&self, config: &Config) -> CpuSizingResult {
        let rate = self.cpu_rate(config);
        let tps_per_user = config.workload.tokens_per_sec_per_user.max(0.0);

        let (mode, requested_users, users, fixed_cpus) = match config.request {
            CoreRequest::Capacity { users } => (Mode::Capacity, Some(users), users, None),
            CoreRequest::Performance { units } => (
                Mode::Performance,
                None,
                self.max_users_for_cpus(config, units),
                Some(units),
            ),
        };

        let total_required_tps = users as f64 * tps_per_user;
        let total_required_flops = finite_or_zero(total_required_tps * rate.flops_per_token);

        let cpus_compute = if rate.target_tps_per_cpu > 0.0 {
            total_required_tps / rate.target_tps_per_cpu
        } else {
            0.0
        };
        let cpus_with_prefill = cpus_compute * rate.prefill_multiplier;
        let cpus_for_compute = ceil_units(cpus_with_prefill * rate.redundancy);

        let arch = self.architecture(config);
        let kv_bytes_per_token =
            kv_cache::kv_bytes_per_token(&arch, self.kv_bytes_per_value(config));
        let model_ram_gb = self.cpu_model_ram_gb(config);
        let kv_cache = self.cpu_kv_cache(config, kv_bytes_per_token, users);
        let total_ram_gb = model_ram_gb + kv_cache.vram_gb;
        let cpus_for_memory = if config.hardware.memory_gb > 0.0 {
            ceil_units(total_ram_gb / config.hardware.memory_gb)
        } else {
            0
        };

        let final_cpus =
            fixed_cpus.unwrap_or_else(|| cpus_for_compute.max(cpus_for_memory).max(1));

        let max_users = match fixed_cpus {
            Some(_) => users,
            None => self.max_users_for_cpus(config, final_cpus),
        };

        if fixed_cpus.is_some() && cpus_for_memory > final_cpus {
            log::warn!(
                "{} CPUs cannot hold model + KV cache for {} users ({} CPUs needed)",
                final_cpus,
                max_users,
                cpus_for_memory
            );
        }

        log::debug!(
            "cpu sizing: {:.2} GFLOPs/token, {:.1} tok/s/CPU, {:.2} -> {:.2} CPUs x{:.2}, \
             memory {} -> {} CPUs",
            rate.flops_per_token / 1e9,
            rate.target_tps_per_cpu,
            cpus_compute,
            cpus_with_prefill,
            rate.redundancy,
            cpus_for_memory,
            final_cpus
        );

        CpuSizingResult {
            mode,
            hardware: config.hardware.name.clone(),
            model: config.model.display_name(),
            quantization: config.quantization,
            architecture: arch,
            requested_users,
            max_users,
            flops_per_token: rate.flops_per_token,
            flops_per_token_gflops: rate.flops_per_token / 1e9,
            usable_flops_per_cpu: rate.usable_flops_per_cpu,
            target_tps_per_cpu: rate.target_tps_per_cpu,
            total_required_tps,
            total_required_flops,
            cpus_compute,
            cpus_with_prefill,
            redundancy_multiplier: rate.redundancy,
            cpus_for_compute,
            cpus_for_memory,
            final_cpus,
            bottleneck: if cpus_for_memory > cpus_for_compute {
                Bottleneck::Memory
            } else {
                Bottleneck::Compute
            },
            model_ram_gb,
            kv_bytes_per_token,
            kv_cache,
            total_ram_gb,
            ram_per_cpu_gb: if final_cpus > 0 {
                total_ram_gb / final_cpus as f64
            } else {
                0.0
            },
            delivered_tps: final_cpus as f64 * rate.target_tps_per_cpu,
        }
    }
}
