//! Render-time formatting. Stored values stay unrounded; rounding happens here only.

use crate::utils::group_digits;

pub const MISSING: &str = "—";

/// `format!("{:.N}")` without the "-0.00" a tiny negative rounds to.
fn fixed(v: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, v);
    match s.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => s,
    }
}

/// "-66.95%" for `Some(-66.95)` at 2 decimals, "—" for `None`.
pub fn format_percent(change: Option<f64>, decimals: usize) -> String {
    match change {
        Some(v) => format!("{}%", fixed(v, decimals)),
        None => MISSING.to_string(),
    }
}

/// True when `v` shows as zero at `decimals` places.
pub fn rounds_to_zero(v: f64, decimals: usize) -> bool {
    fixed(v.abs(), decimals).chars().all(|c| c == '0' || c == '.')
}

/// Thousands-grouped price with at most two decimals: 21983 → "21,983", 1234.5 → "1,234.5".
pub fn format_price(price: Option<f64>) -> String {
    let Some(v) = price else {
        return MISSING.to_string();
    };

    let text = fixed(v, 2);
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let frac = frac.trim_end_matches('0');

    if frac.is_empty() {
        format!("{}{}", sign, group_digits(whole))
    } else {
        format!("{}{}.{}", sign, group_digits(whole), frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::parse_currency;

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(10.0), 2), "10.00%");
        assert_eq!(format_percent(Some(-12.34), 1), "-12.3%");
        assert_eq!(format_percent(Some(0.0), 0), "0%");
        assert_eq!(format_percent(None, 2), MISSING);
    }

    #[test]
    fn test_format_percent_no_negative_zero() {
        assert_eq!(format_percent(Some(-0.001), 2), "0.00%");
        assert_eq!(format_percent(Some(-0.0), 0), "0%");
        assert_eq!(format_percent(Some(-0.006), 2), "-0.01%");
    }

    #[test]
    fn test_format_percent_idempotent() {
        let stored = (1983.0_f64 - 6000.0) / 6000.0 * 100.0;
        let first = format_percent(Some(stored), 2);
        let second = format_percent(Some(stored), 2);
        assert_eq!(first, second);
        assert_eq!(first, "-66.95%");
    }

    #[test]
    fn test_rounds_to_zero() {
        assert!(rounds_to_zero(0.0, 2));
        assert!(rounds_to_zero(-0.004, 2));
        assert!(!rounds_to_zero(0.005001, 2));
        assert!(!rounds_to_zero(-3.0, 0));
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Some(21983.0)), "21,983");
        assert_eq!(format_price(Some(1234.5)), "1,234.5");
        assert_eq!(format_price(Some(1234.567)), "1,234.57");
        assert_eq!(format_price(Some(-0.5)), "-0.5");
        assert_eq!(format_price(Some(-0.001)), "0");
        assert_eq!(format_price(Some(999.0)), "999");
        assert_eq!(format_price(None), MISSING);
    }

    #[test]
    fn test_format_price_beyond_i64() {
        let huge = parse_currency("1e20");
        assert!(huge.unwrap() > (i64::MAX / 100) as f64);
        assert_eq!(format_price(huge), "100,000,000,000,000,000,000");
        assert_eq!(format_price(Some(-1e20)), "-100,000,000,000,000,000,000");
    }
}
