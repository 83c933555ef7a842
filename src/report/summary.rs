use super::format::{format_flops, format_gb, format_pct};
use super::result::{CoreResult, CpuSizingResult};

impl CoreResult {
    pub fn print(&self) {
        println!("\n=== {} result ({}) ===\n", self.mode, self.hardware);

        println!("Model: {} ({})", self.model, self.quantization);
        println!(
            "  Architecture: {} layers, hidden {}, {} heads / {} KV heads",
            self.architecture.num_layers,
            self.architecture.hidden_size,
            self.architecture.num_heads,
            self.architecture.num_kv_heads
        );

        println!("\nCompute:");
        println!(
            "  Decode FLOPs/token:  {}",
            format_flops(self.decode_flops_per_token)
        );
        println!(
            "  Prefill FLOPs/token: {}",
            format_flops(self.prefill_flops_per_token)
        );
        println!("  FLOPs per user:      {}", format_flops(self.flops_per_user));
        println!("  Required:            {}", format_flops(self.required_flops));
        println!(
            "  Effective per unit:  {}",
            format_flops(self.effective_flops_per_unit)
        );
        println!(
            "  Overheads:           prefill {}, attention {}",
            format_pct(self.prefill_overhead_pct / 100.0),
            format_pct(self.attention_overhead_pct / 100.0)
        );

        println!("\nMemory:");
        println!("  Model:               {}", format_gb(self.model_size_gb));
        println!(
            "  KV cache:            {} total, {} active, {} in VRAM",
            format_gb(self.kv_cache.total_gb),
            format_gb(self.kv_cache.active_gb),
            format_gb(self.kv_cache.vram_gb)
        );
        println!(
            "  Required per unit:   {}",
            format_gb(self.required_vram_per_unit_gb)
        );

        println!("\nSizing:");
        println!(
            "  Units: {} (compute {}, memory {}, {:?}-bound)",
            self.units, self.units_for_compute, self.units_for_memory, self.bottleneck
        );
        if let Some(users) = self.requested_users {
            println!("  Requested users: {}", users);
        }
        println!("  Max users: {}", self.max_users);
        println!(
            "  Throughput: {:.0} tok/s per unit, {:.0} tok/s total",
            self.throughput_per_unit, self.system_tokens_per_sec
        );
    }
}

impl CpuSizingResult {
    pub fn print(&self) {
        println!("\n=== CPU {} result ({}) ===\n", self.mode, self.hardware);

        println!("Model: {} ({})", self.model, self.quantization);
        println!(
            "  FLOPs/token:         {:.2} GFLOPS",
            self.flops_per_token_gflops
        );
        println!(
            "  Usable per CPU:      {}",
            format_flops(self.usable_flops_per_cpu)
        );
        println!("  Target tok/s/CPU:    {:.1}", self.target_tps_per_cpu);
        println!(
            "  Required:            {:.0} tok/s ({})",
            self.total_required_tps,
            format_flops(self.total_required_flops)
        );

        println!("\nMemory:");
        println!("  Model RAM:           {}", format_gb(self.model_ram_gb));
        println!("  KV cache RAM:        {}", format_gb(self.kv_cache.vram_gb));
        println!("  Total RAM:           {}", format_gb(self.total_ram_gb));

        println!("\nSizing:");
        println!(
            "  CPUs: {} (compute {:.2} -> {:.2} with prefill, x{:.2} redundancy; memory {})",
            self.final_cpus,
            self.cpus_compute,
            self.cpus_with_prefill,
            self.redundancy_multiplier,
            self.cpus_for_memory
        );
        println!("  Max users: {}", self.max_users);
        println!("  Delivered: {:.0} tok/s", self.delivered_tps);
    }
}
