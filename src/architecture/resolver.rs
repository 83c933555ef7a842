use super::{Architecture, ArchitectureTable};
use crate::config::ModelSpec;

/// Minimum layer count for fabricated custom architectures
const CUSTOM_MIN_LAYERS: u32 = 32;

/// Relative params mismatch tolerated before a named lookup warns
const NAMED_PARAMS_TOLERANCE: f64 = 0.1;

/// Maps a parameter count (and optional name) to an architecture.
///
/// Lookup order:
/// 1. named table entry (MoE models)
/// 2. names containing "custom" scale the reference shape by parameter count
/// 3. exact match on the sized table
/// 4. linear interpolation between the two neighbouring sizes
/// 5. clamp to the smallest/largest entry outside the table range
pub struct ArchitectureResolver<'a> {
    table: &'a ArchitectureTable,
}

impl<'a> ArchitectureResolver<'a> {
    pub fn new(table: &'a ArchitectureTable) -> Self {
        Self { table }
    }

    pub fn resolve(&self, params_billions: f64, name: Option<&str>) -> Architecture {
        if let Some(name) = name {
            if let Some(entry) = self.table.by_name(name) {
                let drift = (params_billions - entry.params_billions).abs() / entry.params_billions;
                if drift > NAMED_PARAMS_TOLERANCE {
                    log::warn!(
                        "{} is a {}B model but {}B params were given; using the named shape",
                        entry.name,
                        entry.params_billions,
                        params_billions
                    );
                }
                return entry.architecture;
            }
            if name.to_ascii_lowercase().contains("custom") {
                return self.custom(params_billions);
            }
        }

        self.by_size(params_billions)
    }

    /// Resolve the shape for a model, applying its declared expert counts
    pub fn resolve_model(&self, model: &ModelSpec) -> Architecture {
        let mut arch = self.resolve(model.params_billions, model.name.as_deref());
        if model.moe.is_some() {
            arch.moe = model.moe;
        }
        arch
    }

    /// Scale the reference configuration's depth proportionally to size
    fn custom(&self, params_billions: f64) -> Architecture {
        let (reference_params, reference) = self.table.reference();
        let scale = if params_billions.is_finite() && params_billions > 0.0 {
            params_billions / reference_params
        } else {
            0.0
        };
        let layers = (reference.num_layers as f64 * scale).round() as u32;

        Architecture {
            num_layers: layers.max(CUSTOM_MIN_LAYERS),
            moe: None,
            ..reference
        }
    }

    fn by_size(&self, params_billions: f64) -> Architecture {
        let sized = self.table.sized();
        let (Some(first), Some(last)) = (sized.first(), sized.last()) else {
            return self.table.reference().1;
        };

        if !params_billions.is_finite() || params_billions <= first.0 {
            return first.1;
        }
        if params_billions >= last.0 {
            return last.1;
        }

        for pair in sized.windows(2) {
            let (lo_params, lo) = pair[0];
            let (hi_params, hi) = pair[1];
            if params_billions == lo_params {
                return lo;
            }
            if params_billions < hi_params {
                let t = (params_billions - lo_params) / (hi_params - lo_params);
                return interpolate(&lo, &hi, t);
            }
        }

        last.1
    }
}

fn lerp(a: u32, b: u32, t: f64) -> u32 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u32
}

fn interpolate(lo: &Architecture, hi: &Architecture, t: f64) -> Architecture {
    let num_heads = lerp(lo.num_heads, hi.num_heads, t).max(1);
    Architecture {
        num_layers: lerp(lo.num_layers, hi.num_layers, t).max(1),
        hidden_size: lerp(lo.hidden_size, hi.hidden_size, t).max(1),
        num_heads,
        num_kv_heads: lerp(lo.num_kv_heads, hi.num_kv_heads, t).clamp(1, num_heads),
        intermediate_size: lerp(lo.intermediate_size, hi.intermediate_size, t).max(1),
        moe: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_test<F: FnOnce(&ArchitectureResolver)>(f: F) {
        let table = ArchitectureTable::standard();
        let resolver = ArchitectureResolver::new(&table);
        f(&resolver);
    }

    #[test]
    fn test_exact_match() {
        resolver_test(|r| {
            let arch = r.resolve(70.0, None);
            assert_eq!(arch.num_layers, 80);
            assert_eq!(arch.hidden_size, 8192);
            assert_eq!(arch.num_kv_heads, 8);

            let arch = r.resolve(7.0, None);
            assert_eq!(arch.num_kv_heads, 32);
        });
    }

    #[test]
    fn test_interpolates_between_sizes() {
        resolver_test(|r| {
            // 40B sits 27/57 of the way from 13B to 70B
            let arch = r.resolve(40.0, None);
            let t: f64 = 27.0 / 57.0;
            assert_eq!(arch.num_layers, (40.0 + 40.0 * t).round() as u32);
            assert_eq!(arch.hidden_size, (5120.0 + 3072.0 * t).round() as u32);
            assert!(arch.num_layers > 40 && arch.num_layers < 80);
            assert!(!arch.is_moe());
        });
    }

    #[test]
    fn test_clamps_outside_range() {
        resolver_test(|r| {
            assert_eq!(r.resolve(1.0, None), r.resolve(7.0, None));
            assert_eq!(r.resolve(1000.0, None), r.resolve(405.0, None));
            assert_eq!(r.resolve(f64::NAN, None), r.resolve(7.0, None));
        });
    }

    #[test]
    fn test_named_moe_entry() {
        resolver_test(|r| {
            let arch = r.resolve(46.7, Some("mixtral-8x7b"));
            let moe = arch.moe.unwrap();
            assert_eq!(moe.total_experts, 8);
            assert_eq!(moe.active_experts, 2);
            assert_eq!(arch.num_layers, 32);
        });
    }

    #[test]
    fn test_named_entry_wins_over_mismatched_params() {
        resolver_test(|r| {
            let named = r.resolve(46.7, Some("mixtral-8x7b"));
            assert_eq!(r.resolve(7.0, Some("mixtral-8x7b")), named);
            assert_ne!(r.resolve(7.0, None), named);
        });
    }

    #[test]
    fn test_custom_model_scales_reference() {
        resolver_test(|r| {
            let arch = r.resolve(140.0, Some("Custom-140B"));
            assert_eq!(arch.num_layers, 160);
            assert_eq!(arch.hidden_size, 8192);
            assert_eq!(arch.num_heads, 64);

            // Small custom models keep the minimum depth
            let arch = r.resolve(3.0, Some("my-custom-model"));
            assert_eq!(arch.num_layers, CUSTOM_MIN_LAYERS);
        });
    }

    #[test]
    fn test_unknown_name_uses_size_table() {
        resolver_test(|r| {
            assert_eq!(r.resolve(70.0, Some("llama-3.1-70b")), r.resolve(70.0, None));
        });
    }

    #[test]
    fn test_resolve_model_applies_declared_experts() {
        resolver_test(|r| {
            let model = ModelSpec::dense(70.0).with_moe(16, 2);
            let arch = r.resolve_model(&model);
            assert_eq!(arch.moe.unwrap().total_experts, 16);
            assert_eq!(arch.num_layers, 80);
        });
    }

    #[test]
    fn test_invariants_hold_across_sizes() {
        resolver_test(|r| {
            let mut params = 0.5;
            while params < 600.0 {
                let arch = r.resolve(params, None);
                assert!(arch.num_layers > 0);
                assert!(arch.hidden_size > 0);
                assert!(arch.num_kv_heads <= arch.num_heads, "{}B", params);
                params *= 1.3;
            }
        });
    }
}
