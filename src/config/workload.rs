use serde::{Deserialize, Serialize};

fn default_tokens_per_sec_per_user() -> f64 {
    10.0
}

fn default_avg_response_tokens() -> f64 {
    500.0
}

fn default_active_kv_fraction() -> f64 {
    1.0
}

/// Per-user serving demand and KV residency levers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadProfile {
    /// Generated tokens per second each user expects
    #[serde(default = "default_tokens_per_sec_per_user")]
    pub tokens_per_sec_per_user: f64,

    /// Average generated tokens per request
    #[serde(default = "default_avg_response_tokens")]
    pub avg_response_tokens: f64,

    /// Fresh prompt tokens per request (prefilled once per request)
    #[serde(default)]
    pub new_input_tokens: f64,

    #[serde(default)]
    pub system_prompt_tokens: f64,

    /// Conversation history carried in the KV cache
    #[serde(default)]
    pub session_history_tokens: f64,

    /// Fraction of provisioned sessions whose KV cache is resident at once
    #[serde(default = "default_active_kv_fraction")]
    pub active_kv_fraction: f64,

    /// Fraction of resident KV cache moved to host memory or NVMe
    #[serde(default)]
    pub kv_offload_ratio: f64,

    /// Bytes per cached K/V value.
    /// If not specified, uses the weight quantization's bytes per parameter.
    #[serde(default)]
    pub kv_bytes_per_value: Option<f64>,
}

impl Default for WorkloadProfile {
    fn default() -> Self {
        Self {
            tokens_per_sec_per_user: default_tokens_per_sec_per_user(),
            avg_response_tokens: default_avg_response_tokens(),
            new_input_tokens: 0.0,
            system_prompt_tokens: 0.0,
            session_history_tokens: 0.0,
            active_kv_fraction: default_active_kv_fraction(),
            kv_offload_ratio: 0.0,
            kv_bytes_per_value: None,
        }
    }
}

impl WorkloadProfile {
    /// Tokens held in the KV cache per session: system prompt + history + input
    pub fn session_tokens(&self) -> f64 {
        (self.system_prompt_tokens + self.session_history_tokens + self.new_input_tokens).max(0.0)
    }

    /// Context length seen by attention while generating a response
    pub fn sequence_length(&self) -> f64 {
        self.session_tokens() + self.avg_response_tokens.max(0.0)
    }

    /// Requests/s per user; zero when the response length is not positive
    pub fn requests_per_sec_per_user(&self) -> f64 {
        if self.avg_response_tokens > 0.0 {
            self.tokens_per_sec_per_user / self.avg_response_tokens
        } else {
            0.0
        }
    }

    pub fn active_fraction(&self) -> f64 {
        clamp_unit(self.active_kv_fraction)
    }

    pub fn offload_ratio(&self) -> f64 {
        clamp_unit(self.kv_offload_ratio)
    }
}

/// Clamp a fraction into [0, 1]; NaN becomes 0
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_and_sequence_tokens() {
        let workload = WorkloadProfile {
            new_input_tokens: 200.0,
            system_prompt_tokens: 1000.0,
            session_history_tokens: 800.0,
            avg_response_tokens: 300.0,
            ..Default::default()
        };
        assert_eq!(workload.session_tokens(), 2000.0);
        assert_eq!(workload.sequence_length(), 2300.0);
    }

    #[test]
    fn test_requests_per_sec_guards_zero_response() {
        let mut workload = WorkloadProfile::default();
        assert_eq!(workload.requests_per_sec_per_user(), 10.0 / 500.0);

        workload.avg_response_tokens = 0.0;
        assert_eq!(workload.requests_per_sec_per_user(), 0.0);

        workload.avg_response_tokens = -5.0;
        assert_eq!(workload.requests_per_sec_per_user(), 0.0);
    }

    #[test]
    fn test_fractions_are_clamped() {
        let workload = WorkloadProfile {
            active_kv_fraction: 1.7,
            kv_offload_ratio: -0.2,
            ..Default::default()
        };
        assert_eq!(workload.active_fraction(), 1.0);
        assert_eq!(workload.offload_ratio(), 0.0);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let workload: WorkloadProfile = toml::from_str("new_input_tokens = 150").unwrap();
        assert_eq!(workload.tokens_per_sec_per_user, 10.0);
        assert_eq!(workload.new_input_tokens, 150.0);
        assert_eq!(workload.active_kv_fraction, 1.0);
        assert!(workload.kv_bytes_per_value.is_none());
    }
}
