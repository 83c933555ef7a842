pub mod memory;

pub use memory::{kv_bytes_per_token, model_size_gb, total_kv_cache, vram_params, KvCacheUsage};
