use thiserror::Error;

/// Errors surfaced at the input boundary.
///
/// The numeric engine itself never fails; only loading and resolving
/// configuration can.
#[derive(Debug, Error)]
pub enum CapacityError {
    /// Hardware identifier could not be turned into a FLOPs/OPS number
    #[error("malformed hardware identifier '{identifier}': {reason}")]
    MalformedHardwareId { identifier: String, reason: String },

    /// Hardware entry has neither a positive peak nor an identifier
    #[error("hardware '{name}' has no peak throughput (set peak_flops or identifier)")]
    MissingPeakThroughput { name: String },

    /// An efficiency factor derates the unit to zero usable throughput
    #[error("hardware '{name}' has no usable throughput: {field} must be positive")]
    NoUsableThroughput { name: String, field: &'static str },

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CapacityError>;
