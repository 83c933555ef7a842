use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric format the model weights are stored and executed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Quantization {
    Fp32,
    Fp16,
    Int8,
    Int4,
    Q4KS,
}

impl Quantization {
    pub const ALL: [Quantization; 5] = [
        Quantization::Fp32,
        Quantization::Fp16,
        Quantization::Int8,
        Quantization::Int4,
        Quantization::Q4KS,
    ];

    /// Parse a quantization name, falling back to fp16 for anything unknown
    pub fn parse_lossy(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fp32" | "f32" | "float32" => Quantization::Fp32,
            "fp16" | "f16" | "bf16" | "float16" | "bfloat16" => Quantization::Fp16,
            "int8" | "i8" | "fp8" | "q8" | "q8_0" => Quantization::Int8,
            "int4" | "i4" | "q4" | "q4_0" => Quantization::Int4,
            "q4_k_s" | "q4ks" => Quantization::Q4KS,
            other => {
                log::warn!("unknown quantization '{}', using fp16", other);
                Quantization::Fp16
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quantization::Fp32 => "fp32",
            Quantization::Fp16 => "fp16",
            Quantization::Int8 => "int8",
            Quantization::Int4 => "int4",
            Quantization::Q4KS => "q4_k_s",
        }
    }
}

impl Default for Quantization {
    fn default() -> Self {
        Quantization::Fp16
    }
}

impl From<String> for Quantization {
    fn from(name: String) -> Self {
        Quantization::parse_lossy(&name)
    }
}

impl From<Quantization> for String {
    fn from(quant: Quantization) -> Self {
        quant.as_str().to_string()
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage size and derating factor for one quantization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationProfile {
    pub bytes_per_param: f64,

    /// Accuracy/kernel-overhead derating, 0 < Q <= 1
    pub efficiency: f64,
}

/// Lookup table from quantization to its profile
#[derive(Debug, Clone)]
pub struct QuantizationTable {
    fp32: QuantizationProfile,
    fp16: QuantizationProfile,
    int8: QuantizationProfile,
    int4: QuantizationProfile,
    q4_k_s: QuantizationProfile,
}

impl QuantizationTable {
    pub fn standard() -> Self {
        Self {
            fp32: QuantizationProfile {
                bytes_per_param: 4.0,
                efficiency: 1.0,
            },
            fp16: QuantizationProfile {
                bytes_per_param: 2.0,
                efficiency: 0.95,
            },
            int8: QuantizationProfile {
                bytes_per_param: 1.0,
                efficiency: 0.85,
            },
            int4: QuantizationProfile {
                bytes_per_param: 0.5,
                efficiency: 0.6,
            },
            // 4.5 bits per weight including block scales
            q4_k_s: QuantizationProfile {
                bytes_per_param: 0.5625,
                efficiency: 0.35,
            },
        }
    }

    pub fn profile(&self, quant: Quantization) -> QuantizationProfile {
        match quant {
            Quantization::Fp32 => self.fp32,
            Quantization::Fp16 => self.fp16,
            Quantization::Int8 => self.int8,
            Quantization::Int4 => self.int4,
            Quantization::Q4KS => self.q4_k_s,
        }
    }

    pub fn bytes_per_param(&self, quant: Quantization) -> f64 {
        self.profile(quant).bytes_per_param
    }

    pub fn efficiency(&self, quant: Quantization) -> f64 {
        self.profile(quant).efficiency
    }

    /// Replace the profile for one quantization
    pub fn with_profile(mut self, quant: Quantization, profile: QuantizationProfile) -> Self {
        let slot = match quant {
            Quantization::Fp32 => &mut self.fp32,
            Quantization::Fp16 => &mut self.fp16,
            Quantization::Int8 => &mut self.int8,
            Quantization::Int4 => &mut self.int4,
            Quantization::Q4KS => &mut self.q4_k_s,
        };
        *slot = profile;
        self
    }
}

impl Default for QuantizationTable {
    fn default() -> Self {
        Self::standard()
    }
}
