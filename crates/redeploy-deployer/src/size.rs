//! Human-readable byte sizes as printed by docker ("512MB", "1.2kB")

use once_cell::sync::Lazy;
use regex::Regex;

static SIZE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*([A-Za-z]*)\s*$").expect("size token regex is valid")
});

const KIB: f64 = 1024.0;

/// Convert a size token to bytes using 1024-based units.
///
/// Unknown units leave the number unscaled; anything that is not a number
/// followed by letters yields 0.
pub fn parse_size(token: &str) -> f64 {
    let Some(caps) = SIZE_TOKEN.captures(token) else {
        return 0.0;
    };

    let value: f64 = match caps[1].parse() {
        Ok(value) => value,
        Err(_) => return 0.0,
    };

    let multiplier = match caps[2].to_ascii_lowercase().as_str() {
        "b" => 1.0,
        "kb" | "kib" => KIB,
        "mb" | "mib" => KIB.powi(2),
        "gb" | "gib" => KIB.powi(3),
        "tb" | "tib" => KIB.powi(4),
        _ => 1.0,
    };

    value * multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_units() {
        assert_eq!(parse_size("10.5MB"), 10.5 * 1024.0 * 1024.0);
        assert_eq!(parse_size("1GB"), 1024.0 * 1024.0 * 1024.0);
        assert_eq!(parse_size("2kB"), 2048.0);
        assert_eq!(parse_size("1tb"), 1024f64.powi(4));
        assert_eq!(parse_size("300B"), 300.0);
    }

    #[test]
    fn test_unknown_unit_is_unscaled() {
        assert_eq!(parse_size("5xx"), 5.0);
        assert_eq!(parse_size("42"), 42.0);
    }

    #[test]
    fn test_no_match_is_zero() {
        assert_eq!(parse_size(""), 0.0);
        assert_eq!(parse_size("MB"), 0.0);
        assert_eq!(parse_size("abc 12"), 0.0);
    }
}
