//! Unified capacity/performance solver.
//!
//! Both modes share one demand model: FLOPs per user per second from decode
//! and prefill, scaled by additive overheads. Efficiency, utilization,
//! headroom and redundancy only act on the supply side.

use super::arithmetic::{FlopsModel, FlopsMultipliers, ServingPattern};
use super::overhead::{capacity_margin, OverheadCombination, Overheads};
use super::{ceil_units, finite_or_zero, floor_users, UNBOUNDED_USERS};
use crate::architecture::{Architecture, ArchitectureResolver, ArchitectureTable};
use crate::config::{Config, CoreRequest, DeviceType, Mode, QuantizationTable};
use crate::kv_cache::{self, KvCacheUsage};
use crate::report::{Bottleneck, Calculation, CoreResult};
use std::sync::OnceLock;

/// Static reference tables the engine reads from
#[derive(Debug, Clone)]
pub struct EngineTables {
    pub quantization: QuantizationTable,
    pub flops: FlopsMultipliers,
    pub architectures: ArchitectureTable,
}

impl EngineTables {
    pub fn new(
        quantization: QuantizationTable,
        flops: FlopsMultipliers,
        architectures: ArchitectureTable,
    ) -> Self {
        Self {
            quantization,
            flops,
            architectures,
        }
    }

    /// Process-wide standard tables, built once and read-only afterwards
    pub fn standard() -> &'static EngineTables {
        static STANDARD: OnceLock<EngineTables> = OnceLock::new();
        STANDARD.get_or_init(EngineTables::default)
    }
}

impl Default for EngineTables {
    fn default() -> Self {
        Self::new(
            QuantizationTable::standard(),
            FlopsMultipliers::standard(),
            ArchitectureTable::standard(),
        )
    }
}

/// Per-user demand shared by both modes
#[derive(Debug, Clone)]
pub(crate) struct Demand {
    pub arch: Architecture,
    pub decode_flops_per_token: f64,
    pub prefill_flops_per_token: f64,
    pub overheads: Overheads,
    /// FLOPs/s one user requires, overheads included
    pub flops_per_user: f64,
    pub model_size_gb: f64,
    pub kv_bytes_per_token: f64,
}

/// Units and users resolved by one mode, before assembly into a result
struct Sizing {
    mode: Mode,
    requested_users: Option<u64>,
    /// Users the workload figures (required FLOPs, KV) are computed for
    load_users: u64,
    units: u64,
    max_users: u64,
    units_for_compute: u64,
    units_for_memory: u64,
    kv_cache: KvCacheUsage,
}

/// Stateless calculator over a set of reference tables
#[derive(Debug, Clone, Copy)]
pub struct CapacityEngine<'a> {
    tables: &'a EngineTables,
}

impl CapacityEngine<'static> {
    pub fn standard() -> Self {
        Self::new(EngineTables::standard())
    }
}

impl Default for CapacityEngine<'static> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'a> CapacityEngine<'a> {
    pub fn new(tables: &'a EngineTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &'a EngineTables {
        self.tables
    }

    /// Run the calculation on the path matching the hardware's device class
    pub fn calculate(&self, config: &Config) -> Calculation {
        match config.hardware.device {
            DeviceType::Gpu => Calculation::Gpu(self.calculate_core(config)),
            DeviceType::Cpu => Calculation::Cpu(self.size_cpus(config)),
        }
    }

    /// Unified solver in whichever mode the request selects
    pub fn calculate_core(&self, config: &Config) -> CoreResult {
        match config.request {
            CoreRequest::Capacity { users } => self.capacity(config, users),
            CoreRequest::Performance { units } => self.performance(config, units),
        }
    }

    pub fn architecture(&self, config: &Config) -> Architecture {
        ArchitectureResolver::new(&self.tables.architectures).resolve_model(&config.model)
    }

    /// Bytes per cached K/V value: explicit workload setting, else weight precision
    pub fn kv_bytes_per_value(&self, config: &Config) -> f64 {
        config
            .workload
            .kv_bytes_per_value
            .filter(|bytes| bytes.is_finite() && *bytes > 0.0)
            .unwrap_or_else(|| self.tables.quantization.bytes_per_param(config.quantization))
    }

    /// Peak * kernel efficiency * utilization
    pub fn effective_flops_per_unit(&self, config: &Config) -> f64 {
        let efficiency = &config.efficiency;
        finite_or_zero(
            config.hardware.peak_flops
                * efficiency.kernel_efficiency.max(0.0)
                * efficiency.utilization_factor.max(0.0),
        )
    }

    pub(crate) fn demand(&self, config: &Config) -> Demand {
        let arch = self.architecture(config);
        let device = config.hardware.device;
        let workload = &config.workload;

        let flops = FlopsModel::new(&self.tables.flops, ServingPattern::Continuous);
        let decode = flops.decode_flops_per_token(
            &config.model,
            &arch,
            device,
            Some(workload.sequence_length()),
        );
        let prefill = flops.prefill_flops_per_token(&config.model, &arch, device);
        let overheads = Overheads::resolve(&config.efficiency, workload);

        // Decode per generated token, prefill once per request
        let decode_rate = workload.tokens_per_sec_per_user.max(0.0) * decode;
        let prefill_rate = workload.requests_per_sec_per_user().max(0.0)
            * workload.new_input_tokens.max(0.0)
            * prefill;
        let flops_per_user = finite_or_zero(
            (decode_rate + prefill_rate) * overheads.factor(OverheadCombination::Additive),
        );

        let bytes_per_param = self.tables.quantization.bytes_per_param(config.quantization);
        Demand {
            arch,
            decode_flops_per_token: decode,
            prefill_flops_per_token: prefill,
            overheads,
            flops_per_user,
            model_size_gb: kv_cache::model_size_gb(&config.model, &arch, bytes_per_param),
            kv_bytes_per_token: kv_cache::kv_bytes_per_token(
                &arch,
                self.kv_bytes_per_value(config),
            ),
        }
    }

    fn kv_usage(&self, config: &Config, demand: &Demand, users: u64) -> KvCacheUsage {
        let workload = &config.workload;
        kv_cache::total_kv_cache(
            users as f64,
            workload.session_tokens(),
            demand.kv_bytes_per_token,
            workload.active_fraction(),
            workload.offload_ratio(),
        )
    }

    /// Compute-bound and memory-bound unit counts for a user population
    fn unit_breakdown(
        &self,
        config: &Config,
        demand: &Demand,
        users: u64,
    ) -> (u64, u64, KvCacheUsage) {
        let effective = self.effective_flops_per_unit(config);
        let margin = capacity_margin(
            config.efficiency.target_headroom,
            config.efficiency.redundancy,
        );

        let units_for_compute = if effective > 0.0 {
            ceil_units(users as f64 * demand.flops_per_user / effective * margin)
        } else {
            0
        };

        let kv = self.kv_usage(config, demand, users);
        let units_for_memory = if config.hardware.memory_gb > 0.0 {
            ceil_units((demand.model_size_gb + kv.vram_gb) / config.hardware.memory_gb)
        } else {
            0
        };

        (units_for_compute, units_for_memory, kv)
    }

    /// Users a number of units can serve, from compute alone.
    /// No usable throughput serves nobody; no per-user demand is unbounded.
    fn users_for_units(&self, config: &Config, demand: &Demand, units: u64) -> u64 {
        let effective = self.effective_flops_per_unit(config);
        if effective <= 0.0 {
            return 0;
        }
        if demand.flops_per_user <= 0.0 {
            return UNBOUNDED_USERS;
        }
        floor_users(effective * units as f64 / demand.flops_per_user)
    }

    /// Capacity mode: units needed to serve `users`
    pub fn capacity(&self, config: &Config, users: u64) -> CoreResult {
        let demand = self.demand(config);
        let (units_for_compute, units_for_memory, kv_cache) =
            self.unit_breakdown(config, &demand, users);
        let units = units_for_compute.max(units_for_memory).max(1);

        // Recomputed after rounding up; below the request only when the
        // unit has no usable throughput, which Config::resolve rejects
        let max_users = self.users_for_units(config, &demand, units);
        if max_users < users {
            log::warn!(
                "{} has no usable throughput; {} units serve {} of {} users",
                config.hardware.name,
                units,
                max_users,
                users
            );
        }

        log::debug!(
            "capacity: {} users -> {} units (compute {}, memory {}), max {} users",
            users,
            units,
            units_for_compute,
            units_for_memory,
            max_users
        );

        self.assemble(
            config,
            &demand,
            Sizing {
                mode: Mode::Capacity,
                requested_users: Some(users),
                load_users: users,
                units,
                max_users,
                units_for_compute,
                units_for_memory,
                kv_cache,
            },
        )
    }

    /// Performance mode: users a fleet of `units` can serve
    pub fn performance(&self, config: &Config, units: u64) -> CoreResult {
        let demand = self.demand(config);
        let max_users = self.users_for_units(config, &demand, units);
        let (units_for_compute, units_for_memory, kv_cache) =
            self.unit_breakdown(config, &demand, max_users);

        if units_for_memory > units {
            log::warn!(
                "{} units cannot hold model + KV cache for {} users ({} units needed)",
                units,
                max_users,
                units_for_memory
            );
        }

        log::debug!(
            "performance: {} units -> {} users (compute {}, memory {})",
            units,
            max_users,
            units_for_compute,
            units_for_memory
        );

        self.assemble(
            config,
            &demand,
            Sizing {
                mode: Mode::Performance,
                requested_users: None,
                load_users: max_users,
                units,
                max_users,
                units_for_compute,
                units_for_memory,
                kv_cache,
            },
        )
    }

    fn assemble(&self, config: &Config, demand: &Demand, sizing: Sizing) -> CoreResult {
        let effective = self.effective_flops_per_unit(config);
        let units = sizing.units as f64;

        let throughput_per_unit = if demand.flops_per_user > 0.0 {
            finite_or_zero(
                effective / demand.flops_per_user * config.workload.tokens_per_sec_per_user,
            )
        } else {
            0.0
        };

        let per_unit = |gb: f64| if sizing.units > 0 { gb / units } else { 0.0 };

        CoreResult {
            mode: sizing.mode,
            hardware: config.hardware.name.clone(),
            model: config.model.display_name(),
            quantization: config.quantization,
            architecture: demand.arch,
            requested_users: sizing.requested_users,
            units: sizing.units,
            max_users: sizing.max_users,
            required_flops: finite_or_zero(sizing.load_users as f64 * demand.flops_per_user),
            flops_per_user: demand.flops_per_user,
            decode_flops_per_token: demand.decode_flops_per_token,
            prefill_flops_per_token: demand.prefill_flops_per_token,
            effective_flops_per_unit: effective,
            total_system_flops: effective * units,
            units_for_compute: sizing.units_for_compute,
            units_for_memory: sizing.units_for_memory,
            bottleneck: if sizing.units_for_memory > sizing.units_for_compute {
                Bottleneck::Memory
            } else {
                Bottleneck::Compute
            },
            model_size_gb: demand.model_size_gb,
            kv_bytes_per_token: demand.kv_bytes_per_token,
            kv_cache: sizing.kv_cache,
            kv_cache_per_unit_gb: per_unit(sizing.kv_cache.vram_gb),
            required_vram_per_unit_gb: per_unit(demand.model_size_gb + sizing.kv_cache.vram_gb),
            prefill_overhead_pct: demand.overheads.prefill * 100.0,
            attention_overhead_pct: demand.overheads.attention * 100.0,
            capacity_margin: capacity_margin(
                config.efficiency.target_headroom,
                config.efficiency.redundancy,
            ),
            throughput_per_unit,
            system_tokens_per_sec: throughput_per_unit * units,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::overhead::Redundancy;
    use crate::config::ModelSpec;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn engine() -> CapacityEngine<'static> {
        CapacityEngine::standard()
    }

    #[test]
    fn test_required_flops_scenario_70b() {
        let config = Config::test_default();
        let result = engine().calculate_core(&config);

        // 10k users * 10 tok/s * (4.0 * 70e9) * (1 + 0.05 + 0.05)
        assert!((result.required_flops / 1e15 - 30.8).abs() < 1e-6);
        assert!((result.effective_flops_per_unit - 7.2e15).abs() < 1.0);
        assert_eq!(result.units_for_compute, 5);
        assert_eq!(result.units_for_memory, 2);
        assert_eq!(result.units, 5);
        assert_eq!(result.bottleneck, Bottleneck::Compute);
        assert!(result.max_users >= 10_000);
        assert_eq!(result.model_size_gb, 70.0 * 1.0 * 1.2);
    }

    #[test]
    fn test_required_flops_independent_of_capacity_parameters() {
        let base = Config::test_default();
        let reference = engine().calculate_core(&base).required_flops;

        let variants = [
            (0.5, 0.3, Redundancy::Multiplier(1.0), 0.0),
            (0.9, 1.0, Redundancy::Multiplier(2.0), 0.5),
            (0.7, 0.6, Redundancy::Fraction(0.25), 0.1),
            (1.0, 0.8, Redundancy::Multiplier(1.0), 1.0),
        ];

        for (kernel, utilization, redundancy, headroom) in variants {
            let mut config = base.clone();
            config.efficiency.kernel_efficiency = kernel;
            config.efficiency.utilization_factor = utilization;
            config.efficiency.redundancy = redundancy;
            config.efficiency.target_headroom = headroom;

            let result = engine().calculate_core(&config);
            assert!(((result.required_flops - reference) / reference).abs() < 1e-6);
        }
    }

    #[test]
    fn test_headroom_and_redundancy_add_units() {
        let base = Config::test_default();
        let plain = engine().calculate_core(&base);

        let mut config = base.clone();
        config.efficiency.target_headroom = 0.5;
        config.efficiency.redundancy = Redundancy::Multiplier(2.0);
        let padded = engine().calculate_core(&config);

        // ceil(30.8 / 7.2 * 1.5 * 2.0) = ceil(12.83)
        assert_eq!(padded.units_for_compute, 13);
        assert!(padded.units > plain.units);
        assert_eq!(padded.required_flops, plain.required_flops);
    }

    #[test]
    fn test_throughput_consistency() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = Config::test_default();

        for _ in 0..50 {
            let mut config = base.clone();
            config.request = CoreRequest::Capacity {
                users: rng.gen_range(1..100_000),
            };
            config.efficiency.utilization_factor = rng.gen_range(0.2..1.0);

            let result = engine().calculate_core(&config);
            assert_eq!(
                result.system_tokens_per_sec,
                result.throughput_per_unit * result.units as f64
            );
            assert_eq!(
                result.total_system_flops,
                result.effective_flops_per_unit * result.units as f64
            );
        }
    }

    #[test]
    fn test_round_trip_capacity_then_performance() {
        let mut rng = StdRng::seed_from_u64(42);
        let base = Config::test_default();

        for _ in 0..200 {
            let mut config = base.clone();
            config.efficiency.utilization_factor = rng.gen_range(0.1..1.0);
            config.efficiency.target_headroom = rng.gen_range(0.0..0.5);
            config.workload.new_input_tokens = rng.gen_range(0.0..4000.0);
            config.workload.system_prompt_tokens = rng.gen_range(0.0..2000.0);
            config.efficiency.attention_overhead = None;
            config.efficiency.prefill_overhead = None;

            let users = rng.gen_range(1..500_000);
            let capacity = engine().capacity(&config, users);
            assert!(capacity.max_users >= users);

            let performance = engine().performance(&config, capacity.units);
            assert!(
                performance.max_users >= users,
                "{} units serve {} users, wanted {}",
                capacity.units,
                performance.max_users,
                users
            );
        }
    }

    #[test]
    fn test_kv_cache_grows_with_session_tokens() {
        let mut config = Config::test_default();
        config.workload.system_prompt_tokens = 10.0;
        let small = engine().calculate_core(&config);

        config.workload.system_prompt_tokens = 1000.0;
        config.workload.session_history_tokens = 19_000.0;
        config.workload.new_input_tokens = 5000.0;
        let large = engine().calculate_core(&config);

        assert!(large.kv_cache.total_gb > small.kv_cache.total_gb);
        assert!(large.kv_cache.total_gb > small.kv_cache.total_gb * 1000.0);
    }

    #[test]
    fn test_active_fraction_scales_kv() {
        let mut config = Config::test_default();
        config.workload.session_history_tokens = 4000.0;
        config.workload.active_kv_fraction = 0.3;

        let result = engine().calculate_core(&config);
        let expected = result.kv_cache.total_gb * 0.3;
        assert!((result.kv_cache.active_gb - expected).abs() < 0.001);
        assert!((result.kv_cache.vram_gb - result.kv_cache.active_gb).abs() < 1e-9);
    }

    #[test]
    fn test_memory_bound_sizing() {
        let mut config = Config::test_default();
        config.workload.session_history_tokens = 100_000.0;
        let result = engine().calculate_core(&config);

        // 10k sessions * 100k tokens * 163,840 bytes = 163,840 GB of KV
        assert!((result.kv_cache.total_gb - 163_840.0).abs() < 1e-6);
        assert_eq!(result.bottleneck, Bottleneck::Memory);
        assert_eq!(result.units, result.units_for_memory);
        assert!(result.units > result.units_for_compute);

        config.workload.kv_offload_ratio = 0.9;
        let offloaded = engine().calculate_core(&config);
        assert!(offloaded.units_for_memory < result.units_for_memory);
        assert!((offloaded.kv_cache.offloaded_gb - result.kv_cache.active_gb * 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_units_floored_at_one() {
        let mut config = Config::test_default().with_request(CoreRequest::Capacity { users: 0 });
        config.model = ModelSpec::dense(7.0);

        let result = engine().calculate_core(&config);
        assert_eq!(result.units_for_compute, 0);
        assert_eq!(result.units, 1);
        assert_eq!(result.required_flops, 0.0);
    }

    #[test]
    fn test_zero_response_length_drops_prefill_demand() {
        // 400 input + 500 response tokens stays under the long-context floor
        let mut config = Config::test_default();
        config.workload.new_input_tokens = 400.0;
        let with_prefill = engine().calculate_core(&config);
        assert_eq!(with_prefill.decode_flops_per_token, 4.0 * 70.0 * 1e9);

        config.workload.avg_response_tokens = 0.0;
        let without = engine().calculate_core(&config);

        assert!(with_prefill.flops_per_user > without.flops_per_user);
        // 10 tok/s * 280 GFLOPs * 1.1
        assert!((without.flops_per_user - 10.0 * 280e9 * 1.1).abs() < 1.0);

        // Past 1024 tokens the 70B decode multiplier is floored at 10
        config.workload.new_input_tokens = 2000.0;
        let long = engine().calculate_core(&config);
        assert!((long.flops_per_user - 10.0 * 700e9 * 1.1).abs() < 1.0);
    }

    #[test]
    fn test_zero_demand_round_trip() {
        let mut config = Config::test_default();
        config.workload.tokens_per_sec_per_user = 0.0;

        let capacity = engine().capacity(&config, 500);
        assert_eq!(capacity.flops_per_user, 0.0);
        assert_eq!(capacity.units_for_compute, 0);
        assert_eq!(capacity.max_users, UNBOUNDED_USERS);

        let performance = engine().performance(&config, capacity.units);
        assert_eq!(performance.max_users, UNBOUNDED_USERS);
        assert!(performance.max_users >= 500);
        assert_eq!(performance.required_flops, 0.0);
    }

    #[test]
    fn test_no_usable_throughput_serves_nobody() {
        let mut config = Config::test_default();
        config.efficiency.kernel_efficiency = 0.0;

        let capacity = engine().capacity(&config, 10_000);
        assert_eq!(capacity.effective_flops_per_unit, 0.0);
        assert_eq!(capacity.units_for_compute, 0);
        assert_eq!(capacity.max_users, 0);
        assert_eq!(engine().performance(&config, 8).max_users, 0);

        // Rejected before reaching the engine
        let json = serde_json::to_string(&config).unwrap();
        assert!(Config::from_json_str(&json).is_err());
    }

    #[test]
    fn test_performance_mode() {
        let config = Config::test_default().with_request(CoreRequest::Performance { units: 8 });
        let result = engine().calculate_core(&config);

        // 8 * 7.2e15 / 3.08e12
        assert_eq!(result.mode, Mode::Performance);
        assert_eq!(result.units, 8);
        assert_eq!(result.max_users, 18_701);
        assert!(result.requested_users.is_none());
        assert!((result.required_flops - 18_701.0 * 3.08e12).abs() / result.required_flops < 1e-9);
    }

    #[test]
    fn test_derived_overheads_reported() {
        let mut config = Config::test_default();
        config.efficiency.prefill_overhead = None;
        config.efficiency.attention_overhead = None;
        config.workload.new_input_tokens = 1000.0;
        config.workload.session_history_tokens = 6500.0;

        let result = engine().calculate_core(&config);
        assert!((result.prefill_overhead_pct - 15.0).abs() < 1e-9);
        // sequence = 1000 + 6500 + 500 response tokens
        assert!((result.attention_overhead_pct - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_context_raises_decode_flops() {
        let mut config = Config::test_default();
        let short = engine().calculate_core(&config);

        config.workload.session_history_tokens = 4000.0;
        let long = engine().calculate_core(&config);

        assert_eq!(short.decode_flops_per_token, 4.0 * 70.0 * 1e9);
        assert_eq!(long.decode_flops_per_token, 10.0 * 70.0 * 1e9);
        assert_eq!(long.prefill_flops_per_token, short.prefill_flops_per_token);
    }

    #[test]
    fn test_substituted_tables() {
        let mut tables = EngineTables::default();
        tables.flops.gpu.under_200b = 2.0;
        let custom = CapacityEngine::new(&tables);

        let config = Config::test_default();
        let halved = custom.calculate_core(&config);
        let standard = engine().calculate_core(&config);
        assert!((halved.required_flops * 2.0 - standard.required_flops).abs() < 1.0);
    }

    #[test]
    fn test_calculate_dispatches_on_device() {
        let config = Config::test_default();
        assert_eq!(engine().calculate(&config).device(), DeviceType::Gpu);

        let mut cpu = config.clone();
        cpu.hardware.device = DeviceType::Cpu;
        assert_eq!(engine().calculate(&cpu).device(), DeviceType::Cpu);
    }

    #[test]
    fn test_kv_precision_override() {
        let mut config = Config::test_default();
        config.workload.session_history_tokens = 1000.0;
        let int8 = engine().calculate_core(&config);

        config.workload.kv_bytes_per_value = Some(2.0);
        let fp16_kv = engine().calculate_core(&config);
        assert_eq!(fp16_kv.kv_bytes_per_token, int8.kv_bytes_per_token * 2.0);
        assert_eq!(fp16_kv.model_size_gb, int8.model_size_gb);
    }
}
