use crate::architecture::Architecture;
use crate::config::workload::clamp_unit;
use crate::config::ModelSpec;
use serde::{Deserialize, Serialize};

/// Weight footprint multiplier reserving room for activation buffers
pub const ACTIVATION_HEADROOM: f64 = 1.2;

const BYTES_PER_GB: f64 = 1e9;

/// Parameters (billions) that must be resident on each unit.
/// With expert parallelism across S shards: shared + experts / S, where the
/// shared fraction is 1 - active/total experts.
pub fn vram_params(model: &ModelSpec, arch: &Architecture) -> f64 {
    let params = model.params_billions;
    let (Some(moe), Some(shards)) = (arch.moe, model.expert_parallel_shards) else {
        return params;
    };
    if shards <= 1 {
        return params;
    }

    let expert_fraction = moe.active_ratio();
    let shared = params * (1.0 - expert_fraction);
    let experts = params * expert_fraction;
    shared + experts / shards as f64
}

/// Model footprint in GB
/// Formula: vram_params * bytes_per_param * 1.2
pub fn model_size_gb(model: &ModelSpec, arch: &Architecture, bytes_per_param: f64) -> f64 {
    vram_params(model, arch) * bytes_per_param * ACTIVATION_HEADROOM
}

/// KV cache bytes per token across all layers
/// Formula: 2 (K+V) * layers * kv_heads * head_dim * bytes_per_value,
/// i.e. 2 * layers * hidden * bytes * (kv_heads / heads) for GQA
pub fn kv_bytes_per_token(arch: &Architecture, bytes_per_value: f64) -> f64 {
    2.0 * arch.num_layers as f64
        * arch.num_kv_heads as f64
        * arch.head_dim() as f64
        * bytes_per_value
}

/// KV cache footprint for a population of sessions, in GB
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KvCacheUsage {
    /// Every provisioned session fully cached
    pub total_gb: f64,
    /// Sessions concurrently hot (total * active fraction)
    pub active_gb: f64,
    /// Active portion kept in VRAM
    pub vram_gb: f64,
    /// Active portion moved to host memory or NVMe
    pub offloaded_gb: f64,
}

/// Aggregate KV cache across users.
/// Active fraction and offload ratio are independent levers: the first
/// scales what is resident at all, the second moves part of it off-device.
pub fn total_kv_cache(
    users: f64,
    session_tokens: f64,
    bytes_per_token: f64,
    active_fraction: f64,
    offload_ratio: f64,
) -> KvCacheUsage {
    let total_gb = (users.max(0.0) * session_tokens.max(0.0) * bytes_per_token) / BYTES_PER_GB;
    let active_gb = total_gb * clamp_unit(active_fraction);
    let vram_gb = active_gb * (1.0 - clamp_unit(offload_ratio));

    KvCacheUsage {
        total_gb,
        active_gb,
        vram_gb,
        offloaded_gb: active_gb - vram_gb,
    }
}
