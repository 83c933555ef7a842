use crate::architecture::Architecture;
use crate::config::{DeviceType, Mode, Quantization};
use crate::kv_cache::KvCacheUsage;
use serde::{Deserialize, Serialize};

/// Which constraint decided the unit count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bottleneck {
    Compute,
    Memory,
}

/// Result of the unified GPU-style solver. Produced once per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreResult {
    pub mode: Mode,
    pub hardware: String,
    pub model: String,
    pub quantization: Quantization,
    pub architecture: Architecture,

    /// Users asked for (capacity mode only)
    pub requested_users: Option<u64>,
    pub units: u64,
    pub max_users: u64,

    /// FLOPs/s of intrinsic workload, before any capacity margin
    pub required_flops: f64,
    pub flops_per_user: f64,
    pub decode_flops_per_token: f64,
    pub prefill_flops_per_token: f64,
    /// Peak * kernel efficiency * utilization
    pub effective_flops_per_unit: f64,
    pub total_system_flops: f64,

    pub units_for_compute: u64,
    pub units_for_memory: u64,
    pub bottleneck: Bottleneck,

    pub model_size_gb: f64,
    pub kv_bytes_per_token: f64,
    pub kv_cache: KvCacheUsage,
    pub kv_cache_per_unit_gb: f64,
    pub required_vram_per_unit_gb: f64,

    pub prefill_overhead_pct: f64,
    pub attention_overhead_pct: f64,
    /// (1 + headroom) * redundancy
    pub capacity_margin: f64,

    /// Generated tokens/s one unit sustains
    pub throughput_per_unit: f64,
    /// throughput_per_unit * units
    pub system_tokens_per_sec: f64,
}

/// Result of the CPU sizing path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuSizingResult {
    pub mode: Mode,
    pub hardware: String,
    pub model: String,
    pub quantization: Quantization,
    pub architecture: Architecture,

    pub requested_users: Option<u64>,
    pub max_users: u64,

    pub flops_per_token: f64,
    pub flops_per_token_gflops: f64,
    pub usable_flops_per_cpu: f64,
    pub target_tps_per_cpu: f64,

    pub total_required_tps: f64,
    pub total_required_flops: f64,

    /// Fractional CPUs before the long-context penalty and redundancy
    pub cpus_compute: f64,
    /// After the long-context penalty
    pub cpus_with_prefill: f64,
    pub redundancy_multiplier: f64,
    pub cpus_for_compute: u64,
    pub cpus_for_memory: u64,
    pub final_cpus: u64,
    pub bottleneck: Bottleneck,

    pub model_ram_gb: f64,
    pub kv_bytes_per_token: f64,
    /// KV cache on CPU is never offloaded; vram_gb here means resident RAM
    pub kv_cache: KvCacheUsage,
    pub total_ram_gb: f64,
    pub ram_per_cpu_gb: f64,

    pub delivered_tps: f64,
}

impl CpuSizingResult {
    /// Rounding up must never deliver less than required
    pub fn meets_demand(&self) -> bool {
        self.delivered_tps >= self.total_required_tps * (1.0 - 1e-9)
    }
}

/// Outcome of one engine invocation, tagged by hardware path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "device", rename_all = "lowercase")]
pub enum Calculation {
    Gpu(CoreResult),
    Cpu(CpuSizingResult),
}

impl Calculation {
    pub fn device(&self) -> DeviceType {
        match self {
            Calculation::Gpu(_) => DeviceType::Gpu,
            Calculation::Cpu(_) => DeviceType::Cpu,
        }
    }

    pub fn units(&self) -> u64 {
        match self {
            Calculation::Gpu(result) => result.units,
            Calculation::Cpu(result) => result.final_cpus,
        }
    }

    pub fn max_users(&self) -> u64 {
        match self {
            Calculation::Gpu(result) => result.max_users,
            Calculation::Cpu(result) => result.max_users,
        }
    }

    pub fn print(&self) {
        match self {
            Calculation::Gpu(result) => result.print(),
            Calculation::Cpu(result) => result.print(),
        }
    }
}
