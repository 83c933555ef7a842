use crate::architecture::MoeShape;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name, used for named architecture lookup
    #[serde(default)]
    pub name: Option<String>,

    /// Total parameters in billions (all experts included for MoE)
    pub params_billions: f64,

    /// Mixture-of-experts shape (None for dense models)
    #[serde(default)]
    pub moe: Option<MoeShape>,

    /// Override for the active parameter count in billions.
    /// If not specified, derived from the expert ratio.
    #[serde(default)]
    pub active_params_billions: Option<f64>,

    /// Number of shards the experts are split across (expert parallelism)
    #[serde(default)]
    pub expert_parallel_shards: Option<u32>,
}

impl ModelSpec {
    pub fn dense(params_billions: f64) -> Self {
        Self {
            name: None,
            params_billions,
            moe: None,
            active_params_billions: None,
            expert_parallel_shards: None,
        }
    }

    pub fn named(name: &str, params_billions: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::dense(params_billions)
        }
    }

    pub fn with_moe(mut self, total_experts: u32, active_experts: u32) -> Self {
        self.moe = Some(MoeShape {
            total_experts,
            active_experts,
        });
        self
    }

    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}B", self.params_billions),
        }
    }
}
