use super::{Architecture, MoeShape};

/// A table entry keyed by model name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArchitecture {
    pub name: &'static str,
    pub params_billions: f64,
    pub architecture: Architecture,
}

/// Static reference shapes, keyed by parameter count or by name
#[derive(Debug, Clone)]
pub struct ArchitectureTable {
    /// Sorted ascending by parameter count
    sized: Vec<(f64, Architecture)>,
    named: Vec<NamedArchitecture>,
    /// Shape the custom-model path scales from
    reference: (f64, Architecture),
}

impl ArchitectureTable {
    pub fn standard() -> Self {
        let llama_70b = Architecture::dense(80, 8192, 64, 8, 28672);

        let sized = vec![
            (7.0, Architecture::dense(32, 4096, 32, 32, 11008)),
            (8.0, Architecture::dense(32, 4096, 32, 8, 14336)),
            (13.0, Architecture::dense(40, 5120, 40, 40, 13824)),
            (70.0, llama_70b),
            (405.0, Architecture::dense(126, 16384, 128, 8, 53248)),
        ];

        let moe = |layers, hidden, heads, kv_heads, intermediate, total, active| Architecture {
            moe: Some(MoeShape {
                total_experts: total,
                active_experts: active,
            }),
            ..Architecture::dense(layers, hidden, heads, kv_heads, intermediate)
        };

        let named = vec![
            NamedArchitecture {
                name: "mixtral-8x7b",
                params_billions: 46.7,
                architecture: moe(32, 4096, 32, 8, 14336, 8, 2),
            },
            NamedArchitecture {
                name: "mixtral-8x22b",
                params_billions: 141.0,
                architecture: moe(56, 6144, 48, 8, 16384, 8, 2),
            },
            NamedArchitecture {
                name: "deepseek-v3",
                params_billions: 671.0,
                architecture: moe(61, 7168, 128, 128, 18432, 256, 8),
            },
            NamedArchitecture {
                name: "qwen3-235b-a22b",
                params_billions: 235.0,
                architecture: moe(94, 4096, 64, 4, 12288, 128, 8),
            },
        ];

        Self {
            sized,
            named,
            reference: (70.0, llama_70b),
        }
    }

    /// Build a table from explicit entries; sized entries are sorted here
    pub fn new(
        mut sized: Vec<(f64, Architecture)>,
        named: Vec<NamedArchitecture>,
        reference: (f64, Architecture),
    ) -> Self {
        sized.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            sized,
            named,
            reference,
        }
    }

    pub fn sized(&self) -> &[(f64, Architecture)] {
        &self.sized
    }

    pub fn reference(&self) -> (f64, Architecture) {
        self.reference
    }

    /// Case-insensitive lookup by model name
    pub fn by_name(&self, name: &str) -> Option<&NamedArchitecture> {
        let key = name.trim().to_ascii_lowercase();
        self.named.iter().find(|entry| entry.name == key)
    }
}

impl Default for ArchitectureTable {
    fn default() -> Self {
        Self::standard()
    }
}
