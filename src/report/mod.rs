//! Result records handed to presentation layers, plus text formatting.

pub mod format;
pub mod result;
mod summary;

pub use format::{format_flops, format_gb, format_pct};
pub use result::{Bottleneck, Calculation, CoreResult, CpuSizingResult};
