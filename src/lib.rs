pub mod architecture;
pub mod compute;
pub mod config;
pub mod error;
pub mod kv_cache;
pub mod report;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

// Re-export key types
pub use architecture::{Architecture, ArchitectureResolver, ArchitectureTable};
pub use compute::{CapacityEngine, EngineTables};
pub use config::{Config, CoreRequest, DeviceType, Mode, Quantization};
pub use error::{CapacityError, Result};
pub use report::{Bottleneck, Calculation, CoreResult, CpuSizingResult};
