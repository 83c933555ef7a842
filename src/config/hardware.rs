use crate::config::Quantization;
use crate::error::{CapacityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution model of a hardware unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Gpu,
    Cpu,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Gpu => write!(f, "gpu"),
            DeviceType::Cpu => write!(f, "cpu"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// Accelerator or CPU name (e.g., "H100", "Xeon 6980P")
    pub name: String,

    /// Identifier embedding the peak rate and format (e.g., "1979T-FP8").
    /// When present it takes precedence over peak_flops.
    #[serde(default)]
    pub identifier: Option<String>,

    /// Peak FLOPS (or OPS for integer formats) of one unit
    #[serde(default)]
    pub peak_flops: f64,

    /// VRAM (GPU) or system RAM (CPU) per unit, in GB
    pub memory_gb: f64,

    #[serde(default)]
    pub device: DeviceType,

    /// Numeric formats the unit runs natively (empty = unrestricted)
    #[serde(default)]
    pub supported_formats: Vec<String>,
}

impl HardwareConfig {
    pub fn new(name: &str, peak_flops: f64, memory_gb: f64, device: DeviceType) -> Self {
        Self {
            name: name.to_string(),
            identifier: None,
            peak_flops,
            memory_gb,
            device,
            supported_formats: Vec::new(),
        }
    }

    /// Resolve peak_flops from the identifier, if one was given.
    /// Fails when neither source yields a positive throughput.
    pub fn resolve_peak(&mut self) -> Result<()> {
        if let Some(identifier) = &self.identifier {
            let parsed = parse_ops_identifier(identifier)?;
            self.peak_flops = parsed.value;
            if let Some(format) = parsed.format {
                if !self.supported_formats.iter().any(|f| f.eq_ignore_ascii_case(&format)) {
                    self.supported_formats.push(format);
                }
            }
        }

        if !self.peak_flops.is_finite() || self.peak_flops <= 0.0 {
            return Err(CapacityError::MissingPeakThroughput {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Whether the unit natively runs the given quantization
    pub fn supports(&self, quant: Quantization) -> bool {
        self.supported_formats.is_empty()
            || self
                .supported_formats
                .iter()
                .any(|f| Quantization::parse_lossy(f) == quant)
    }
}

/// Numeric value and format parsed from a hardware identifier
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOps {
    /// Rate in FLOPS/OPS
    pub value: f64,
    /// Lowercased numeric format, if the identifier carried one
    pub format: Option<String>,
}

fn prefix_multiplier(c: char) -> Option<f64> {
    match c.to_ascii_uppercase() {
        'K' => Some(1e3),
        'M' => Some(1e6),
        'G' => Some(1e9),
        'T' => Some(1e12),
        'P' => Some(1e15),
        'E' => Some(1e18),
        _ => None,
    }
}

fn is_unit_word(word: &str) -> bool {
    matches!(
        word.to_ascii_uppercase().as_str(),
        "" | "F" | "FLOP" | "FLOPS" | "OP" | "OPS"
    )
}

/// "e15", "E+3" or "e-2" directly after the number; a bare "E" is the exa prefix
fn has_exponent(after_number: &str) -> bool {
    let mut chars = after_number.chars();
    if !matches!(chars.next(), Some('e' | 'E')) {
        return false;
    }
    match chars.next() {
        Some('+' | '-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(c) => c.is_ascii_digit(),
        None => false,
    }
}

/// Parse an identifier such as "1979T-FP8", "9 POPS INT8" or "312 TFLOPS (FP16)"
/// into a single FLOPS/OPS value.
pub fn parse_ops_identifier(identifier: &str) -> Result<ParsedOps> {
    let malformed = |reason: &str| CapacityError::MalformedHardwareId {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    };

    let tail = identifier.trim();
    if !tail.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(malformed("must start with a numeric value"));
    }
    let number_len = tail
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(tail.len());
    let value: f64 = tail[..number_len]
        .parse()
        .map_err(|_| malformed("numeric value is not a number"))?;

    if has_exponent(&tail[number_len..]) {
        return Err(malformed("scientific notation is not supported"));
    }

    let mut rest = tail[number_len..].trim_start();
    let mut multiplier = 1.0;

    // Unit prefix followed by an optional FLOPS/OPS word
    if let Some(c) = rest.chars().next() {
        if let Some(m) = prefix_multiplier(c) {
            let after = &rest[c.len_utf8()..];
            let word_len = after
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(after.len());
            if is_unit_word(&after[..word_len]) {
                multiplier = m;
                rest = &after[word_len..];
            }
        }
    }

    let word_len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    if word_len > 0 && is_unit_word(&rest[..word_len]) {
        rest = &rest[word_len..];
    }
    let rest = rest.trim_start_matches("/s");

    let format = rest
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '(' | ')' | ','))
        .to_ascii_lowercase();

    let value = value * multiplier;
    if !value.is_finite() || value <= 0.0 {
        return Err(malformed("throughput must be positive"));
    }

    Ok(ParsedOps {
        value,
        format: if format.is_empty() { None } else { Some(format) },
    })
}
