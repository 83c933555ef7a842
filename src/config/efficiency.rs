use crate::compute::overhead::Redundancy;
use serde::{Deserialize, Serialize};

fn default_kernel_efficiency() -> f64 {
    1.0
}

fn default_utilization_factor() -> f64 {
    0.8
}

/// Derating and safety-margin parameters for the GPU path.
///
/// kernel_efficiency, utilization_factor, target_headroom and redundancy
/// only decide how many units are provisioned, never the FLOPs requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfficiencyProfile {
    #[serde(default = "default_kernel_efficiency")]
    pub kernel_efficiency: f64,

    #[serde(default = "default_utilization_factor")]
    pub utilization_factor: f64,

    /// Additive attention overhead fraction.
    /// If not specified, derived from the sequence length.
    #[serde(default)]
    pub attention_overhead: Option<f64>,

    /// Additive prefill overhead fraction.
    /// If not specified, derived from the input length.
    #[serde(default)]
    pub prefill_overhead: Option<f64>,

    /// Capacity-side safety margin on the compute-bound unit count
    #[serde(default)]
    pub target_headroom: f64,

    #[serde(default)]
    pub redundancy: Redundancy,
}

impl Default for EfficiencyProfile {
    fn default() -> Self {
        Self {
            kernel_efficiency: default_kernel_efficiency(),
            utilization_factor: default_utilization_factor(),
            attention_overhead: None,
            prefill_overhead: None,
            target_headroom: 0.0,
            redundancy: Redundancy::default(),
        }
    }
}

fn default_amx_efficiency() -> f64 {
    0.6
}

fn default_utilization_target() -> f64 {
    0.7
}

fn default_prefill_multiplier() -> f64 {
    1.0
}

/// Parameters of the CPU sizing path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuProfile {
    /// Fraction of peak OPS the AMX/vector units sustain
    #[serde(default = "default_amx_efficiency")]
    pub amx_efficiency: f64,

    #[serde(default = "default_utilization_target")]
    pub utilization_target: f64,

    /// Long-context penalty on the compute CPU count
    #[serde(default = "default_prefill_multiplier")]
    pub prefill_multiplier: f64,

    #[serde(default)]
    pub redundancy: Redundancy,

    /// GB of RAM per billion parameters.
    /// If not specified, bytes per parameter of the quantization times 1.2.
    #[serde(default)]
    pub model_ram_overhead_factor: Option<f64>,
}

impl Default for CpuProfile {
    fn default() -> Self {
        Self {
            amx_efficiency: default_amx_efficiency(),
            utilization_target: default_utilization_target(),
            prefill_multiplier: default_prefill_multiplier(),
            redundancy: Redundancy::default(),
            model_ram_overhead_factor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_efficiency_defaults_from_empty_table() {
        let efficiency: EfficiencyProfile = toml::from_str("").unwrap();
        assert_eq!(efficiency.kernel_efficiency, 1.0);
        assert_eq!(efficiency.utilization_factor, 0.8);
        assert!(efficiency.attention_overhead.is_none());
        assert_eq!(efficiency.redundancy.multiplier(), 1.0);
    }

    #[test]
    fn test_cpu_profile_redundancy_forms() {
        let explicit: CpuProfile = toml::from_str("redundancy = { fraction = 0.25 }").unwrap();
        assert_eq!(explicit.redundancy, Redundancy::Fraction(0.25));

        let bare: CpuProfile = toml::from_str("redundancy = 1.5").unwrap();
        assert_eq!(bare.redundancy, Redundancy::Multiplier(1.5));

        let bare_fraction: CpuProfile = toml::from_str("redundancy = 0.2").unwrap();
        assert_eq!(bare_fraction.redundancy, Redundancy::Fraction(0.2));
    }
}
