pub mod efficiency;
pub mod hardware;
pub mod model;
pub mod quantization;
pub mod request;
pub mod workload;

pub use efficiency::{CpuProfile, EfficiencyProfile};
pub use hardware::{parse_ops_identifier, DeviceType, HardwareConfig, ParsedOps};
pub use model::ModelSpec;
pub use quantization::{Quantization, QuantizationProfile, QuantizationTable};
pub use request::{CoreRequest, Mode};
pub use workload::WorkloadProfile;

use crate::error::{CapacityError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration that aggregates all inputs of one calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Weight quantization
    #[serde(default)]
    pub quantization: Quantization,
    pub hardware: HardwareConfig,
    pub model: ModelSpec,
    #[serde(default)]
    pub workload: WorkloadProfile,
    #[serde(default)]
    pub efficiency: EfficiencyProfile,
    #[serde(default)]
    pub cpu: CpuProfile,
    pub request: CoreRequest,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        config.resolve()?;
        Ok(config)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(contents)?;
        config.resolve()?;
        Ok(config)
    }

    /// Compute derived fields (peak throughput from the hardware identifier)
    /// and reject derating factors that leave no usable throughput
    pub fn resolve(&mut self) -> Result<()> {
        self.hardware.resolve_peak()?;

        let derating = match self.hardware.device {
            DeviceType::Gpu => [
                ("efficiency.kernel_efficiency", self.efficiency.kernel_efficiency),
                ("efficiency.utilization_factor", self.efficiency.utilization_factor),
            ],
            DeviceType::Cpu => [
                ("cpu.amx_efficiency", self.cpu.amx_efficiency),
                ("cpu.utilization_target", self.cpu.utilization_target),
            ],
        };
        if let Some(&(field, _)) = derating
            .iter()
            .find(|(_, factor)| !factor.is_finite() || *factor <= 0.0)
        {
            return Err(CapacityError::NoUsableThroughput {
                name: self.hardware.name.clone(),
                field,
            });
        }

        if !self.hardware.supports(self.quantization) {
            log::warn!(
                "{} does not list {} among its native formats {:?}",
                self.hardware.name,
                self.quantization,
                self.hardware.supported_formats
            );
        }
        Ok(())
    }

    /// Same inputs with a different request
    pub fn with_request(&self, request: CoreRequest) -> Self {
        Self {
            request,
            ..self.clone()
        }
    }

    /// 70B INT8 on 9 PFLOPS units, 10k users at 10 tok/s, 5% + 5% overhead
    #[cfg(test)]
    pub fn test_default() -> Self {
        let hardware = HardwareConfig {
            name: "Test Accelerator".to_string(),
            identifier: None,
            peak_flops: 9e15,
            memory_gb: 80.0,
            device: DeviceType::Gpu,
            supported_formats: vec!["int8".to_string()],
        };

        let workload = WorkloadProfile {
            tokens_per_sec_per_user: 10.0,
            avg_response_tokens: 500.0,
            new_input_tokens: 0.0,
            system_prompt_tokens: 0.0,
            session_history_tokens: 0.0,
            active_kv_fraction: 1.0,
            kv_offload_ratio: 0.0,
            kv_bytes_per_value: None,
        };

        let efficiency = EfficiencyProfile {
            kernel_efficiency: 1.0,
            utilization_factor: 0.8,
            attention_overhead: Some(0.05),
            prefill_overhead: Some(0.05),
            target_headroom: 0.0,
            redundancy: Default::default(),
        };

        Config {
            quantization: Quantization::Int8,
            hardware,
            model: ModelSpec::dense(70.0),
            workload,
            efficiency,
            cpu: CpuProfile::default(),
            request: CoreRequest::Capacity { users: 10_000 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapacityError;

    const SAMPLE: &str = r#"
quantization = "int8"

[hardware]
name = "H100 SXM"
identifier = "1979T-FP8"
memory_gb = 80

[model]
name = "mixtral-8x7b"
params_billions = 46.7
expert_parallel_shards = 2

[workload]
tokens_per_sec_per_user = 20
new_input_tokens = 400
system_prompt_tokens = 1000

[efficiency]
utilization_factor = 0.6
target_headroom = 0.2
redundancy = { multiplier = 1.1 }

[request]
mode = "capacity"
users = 2500
"#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.quantization, Quantization::Int8);
        assert!((config.hardware.peak_flops - 1.979e15).abs() < 1.0);
        assert_eq!(config.hardware.device, DeviceType::Gpu);
        assert_eq!(config.model.expert_parallel_shards, Some(2));
        assert_eq!(config.workload.tokens_per_sec_per_user, 20.0);
        assert_eq!(config.workload.avg_response_tokens, 500.0);
        assert_eq!(config.efficiency.kernel_efficiency, 1.0);
        assert_eq!(config.request, CoreRequest::Capacity { users: 2500 });
    }

    #[test]
    fn test_malformed_identifier_is_reported() {
        let bad = SAMPLE.replace("1979T-FP8", "fast");
        let err = Config::from_toml_str(&bad).unwrap_err();
        assert!(matches!(err, CapacityError::MalformedHardwareId { .. }));
    }

    #[test]
    fn test_zero_derating_is_rejected() {
        let bad = SAMPLE.replace("utilization_factor = 0.6", "utilization_factor = 0.0");
        let err = Config::from_toml_str(&bad).unwrap_err();
        assert!(matches!(
            err,
            CapacityError::NoUsableThroughput {
                field: "efficiency.utilization_factor",
                ..
            }
        ));

        // CPU hardware checks its own derating factors instead
        let cpu = include_str!("../../configs/cpu.toml")
            .replace("amx_efficiency = 0.6", "amx_efficiency = 0");
        let err = Config::from_toml_str(&cpu).unwrap_err();
        assert!(matches!(
            err,
            CapacityError::NoUsableThroughput {
                field: "cpu.amx_efficiency",
                ..
            }
        ));
    }

    #[test]
    fn test_json_config() {
        let config = Config::test_default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = Config::from_json_str(&json).unwrap();
        assert_eq!(parsed.hardware.peak_flops, 9e15);
        assert_eq!(parsed.request, config.request);
    }

    #[test]
    fn test_with_request() {
        let config = Config::test_default();
        let perf = config.with_request(CoreRequest::Performance { units: 4 });
        assert_eq!(perf.request.mode(), Mode::Performance);
        assert_eq!(perf.model.params_billions, 70.0);
    }

    #[test]
    fn test_shipped_configs_parse() {
        let gpu = Config::from_toml_str(include_str!("../../configs/gpu_capacity.toml")).unwrap();
        assert_eq!(gpu.request, CoreRequest::Capacity { users: 10_000 });
        assert!(gpu.hardware.supports(Quantization::Int8));

        let perf =
            Config::from_toml_str(include_str!("../../configs/gpu_performance.toml")).unwrap();
        assert_eq!(perf.request.mode(), Mode::Performance);
        assert!((perf.hardware.peak_flops - 989e12).abs() < 1.0);
        assert_eq!(perf.efficiency.prefill_overhead, Some(0.1));

        let cpu = Config::from_toml_str(include_str!("../../configs/cpu.toml")).unwrap();
        assert_eq!(cpu.hardware.device, DeviceType::Cpu);
        assert!((cpu.hardware.peak_flops - 330e12).abs() < 1.0);
        assert_eq!(cpu.cpu.prefill_multiplier, 1.2);
    }
}
