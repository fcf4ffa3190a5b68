//! Compact dollar formatting for volumes and balances.

/// `$X.XM` below one billion, `$X.XB` below one trillion, `$X.XT` above.
/// Thresholds apply to the magnitude; negative values keep their sign.
pub fn big_number(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    if magnitude < 1e9 {
        format!("{sign}${:.1}M", magnitude * 1e-6)
    } else if magnitude < 1e12 {
        format!("{sign}${:.1}B", magnitude * 1e-9)
    } else {
        format!("{sign}${:.1}T", magnitude * 1e-12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds() {
        assert_eq!(big_number(2_500_000.0), "$2.5M");
        assert_eq!(big_number(999_000_000.0), "$999.0M");
        assert_eq!(big_number(1_000_000_000.0), "$1.0B");
        assert_eq!(big_number(3_240_000_000.0), "$3.2B");
        assert_eq!(big_number(6.1e12), "$6.1T");
    }

    #[test]
    fn small_and_negative() {
        assert_eq!(big_number(0.0), "$0.0M");
        assert_eq!(big_number(-4_000_000_000.0), "-$4.0B");
    }
}
