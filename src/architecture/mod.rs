//! Structural shape of a transformer, resolved from its parameter count
//! and optional name.

pub mod resolver;
pub mod table;

pub use resolver::ArchitectureResolver;
pub use table::{ArchitectureTable, NamedArchitecture};

use serde::{Deserialize, Serialize};

/// Expert counts of a mixture-of-experts model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoeShape {
    pub total_experts: u32,
    pub active_experts: u32,
}

impl MoeShape {
    /// Fraction of experts routed per token (0, 1]
    pub fn active_ratio(&self) -> f64 {
        if self.total_experts == 0 {
            return 1.0;
        }
        (self.active_experts.min(self.total_experts) as f64 / self.total_experts as f64).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub num_layers: u32,
    pub hidden_size: u32,
    pub num_heads: u32,
    /// KV heads (GQA/MQA); equal to num_heads for MHA
    pub num_kv_heads: u32,
    pub intermediate_size: u32,
    #[serde(default)]
    pub moe: Option<MoeShape>,
}

impl Architecture {
    pub const fn dense(
        num_layers: u32,
        hidden_size: u32,
        num_heads: u32,
        num_kv_heads: u32,
        intermediate_size: u32,
    ) -> Self {
        Self {
            num_layers,
            hidden_size,
            num_heads,
            num_kv_heads,
            intermediate_size,
            moe: None,
        }
    }

    pub fn is_moe(&self) -> bool {
        self.moe.is_some()
    }

    /// Per-head dimension, rounded to the nearest integer
    pub fn head_dim(&self) -> u32 {
        (self.hidden_size as f64 / self.num_heads.max(1) as f64).round() as u32
    }
}
