//! Engagement metric normalization
//!
//! Turns the human-readable counters rendered next to feed actions
//! ("1,234", "1.2K", "3M", "12 Likes") into exact integers.
//! Counters are cosmetic enrichment, so every anomaly resolves to 0.

use once_cell::sync::Lazy;
use regex::Regex;

/// First number in the text, an optional suffix letter after it (spacing
/// allowed), and the character after the suffix (tells "3M" from "3Mbps").
static NUMBER_WITH_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*([KkMm])?(\p{Alphabetic})?").expect("metric pattern is valid")
});

const THOUSAND: f64 = 1_000.0;
const MILLION: f64 = 1_000_000.0;

/// Normalize an abbreviated engagement count into an integer.
///
/// Returns 0 when the text holds no digits or cannot be parsed.
pub fn normalize(text: &str) -> u64 {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();

    let Some(caps) = NUMBER_WITH_SUFFIX.captures(&cleaned) else {
        return 0;
    };
    let Some(number) = caps.get(1).map(|m| m.as_str()) else {
        return 0;
    };

    // A suffix letter followed by more letters belongs to a word
    let multiplier = match (caps.get(2), caps.get(3)) {
        (Some(suffix), None) => match suffix.as_str() {
            "K" | "k" => Some(THOUSAND),
            _ => Some(MILLION),
        },
        _ => None,
    };

    match multiplier {
        Some(factor) => scale(number, factor),
        None => leading_digits(number),
    }
}

/// Decimal prefix times the suffix factor, truncated toward zero.
fn scale(number: &str, factor: f64) -> u64 {
    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            let scaled = (value * factor).trunc();
            if scaled >= u64::MAX as f64 {
                0
            } else {
                scaled as u64
            }
        }
        _ => 0,
    }
}

/// First maximal run of decimal digits, parsed as an integer.
fn leading_digits(number: &str) -> u64 {
    let digits: String = number.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1,234", 1234)]
    #[case("1.2K", 1200)]
    #[case("3M", 3_000_000)]
    #[case("", 0)]
    #[case("no digits here", 0)]
    #[case("12 Likes", 12)]
    #[case("1.5k", 1500)]
    #[case("2.75m", 2_750_000)]
    #[case("  42  ", 42)]
    #[case("1.9", 1)]
    #[case("5Mbps", 5)]
    #[case("12 Members", 12)]
    #[case("1.2K views", 1200)]
    #[case("1,234,567 views", 1_234_567)]
    #[case("1.2 K", 1200)]
    #[case("3 M", 3_000_000)]
    #[case("4 k views", 4000)]
    #[case("7 Mentions", 7)]
    fn test_normalize_table(#[case] input: &str, #[case] expected: u64) {
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn test_overflowing_digits_resolve_to_zero() {
        assert_eq!(normalize("99999999999999999999999999"), 0);
    }

    #[test]
    fn test_overflowing_suffix_resolves_to_zero() {
        assert_eq!(normalize("99999999999999999999M"), 0);
    }

    #[test]
    fn test_label_with_leading_text() {
        assert_eq!(normalize("Liked by 345 people"), 345);
    }
}
