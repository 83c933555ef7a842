use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the calculation is given.
///
/// Capacity: a user count is fixed, solve for units.
/// Performance: a unit count is fixed, solve for users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CoreRequest {
    Capacity { users: u64 },
    Performance { units: u64 },
}

impl CoreRequest {
    pub fn mode(&self) -> Mode {
        match self {
            CoreRequest::Capacity { .. } => Mode::Capacity,
            CoreRequest::Performance { .. } => Mode::Performance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Capacity,
    Performance,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Capacity => f.write_str("capacity"),
            Mode::Performance => f.write_str("performance"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        request: CoreRequest,
    }

    #[test]
    fn test_tagged_request_parsing() {
        let parsed: Wrapper =
            toml::from_str("[request]\nmode = \"capacity\"\nusers = 500").unwrap();
        assert_eq!(parsed.request, CoreRequest::Capacity { users: 500 });
        assert_eq!(parsed.request.mode(), Mode::Capacity);

        let parsed: Wrapper =
            toml::from_str("[request]\nmode = \"performance\"\nunits = 8").unwrap();
        assert_eq!(parsed.request, CoreRequest::Performance { units: 8 });
    }

    #[test]
    fn test_mode_must_match_fields() {
        let parsed = toml::from_str::<Wrapper>("[request]\nmode = \"performance\"\nusers = 8");
        assert!(parsed.is_err());
    }
}
