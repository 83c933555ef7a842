//! Human-readable units for presentation layers

const FLOPS_PREFIXES: [(f64, &str); 6] = [
    (1e18, "E"),
    (1e15, "P"),
    (1e12, "T"),
    (1e9, "G"),
    (1e6, "M"),
    (1e3, "K"),
];

/// Format a FLOPS value with a decimal prefix, e.g. "30.80 PFLOPS"
pub fn format_flops(flops: f64) -> String {
    if !flops.is_finite() {
        return "-".to_string();
    }
    for (scale, prefix) in FLOPS_PREFIXES {
        if flops.abs() >= scale {
            return format!("{:.2} {}FLOPS", flops / scale, prefix);
        }
    }
    format!("{:.2} FLOPS", flops)
}

/// Format a size in GB, switching to TB above 1000 GB
pub fn format_gb(gb: f64) -> String {
    if !gb.is_finite() {
        return "-".to_string();
    }
    if gb.abs() >= 1000.0 {
        format!("{:.2} TB", gb / 1000.0)
    } else {
        format!("{:.1} GB", gb)
    }
}

/// Fraction as a percentage, e.g. 0.05 -> "5.0%"
pub fn format_pct(fraction: f64) -> String {
    if !fraction.is_finite() {
        return "-".to_string();
    }
    format!("{:.1}%", fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_flops() {
        assert_eq!(format_flops(30.8e15), "30.80 PFLOPS");
        assert_eq!(format_flops(14e9), "14.00 GFLOPS");
        assert_eq!(format_flops(420e12), "420.00 TFLOPS");
        assert_eq!(format_flops(12.0), "12.00 FLOPS");
        assert_eq!(format_flops(f64::NAN), "-");
    }

    #[test]
    fn test_format_gb() {
        assert_eq!(format_gb(84.0), "84.0 GB");
        assert_eq!(format_gb(3276.8), "3.28 TB");
        assert_eq!(format_gb(f64::INFINITY), "-");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(0.05), "5.0%");
        assert_eq!(format_pct(0.3), "30.0%");
    }
}
