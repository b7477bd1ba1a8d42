//! Monetary string normalization.
//!
//! Upstream mention text mixes locale conventions: `1,234.56`, `1.234,56`,
//! `12,5`, `1,234` all occur in the same corpus. Normalization decides the
//! role of each separator from the string alone, then parses the result as
//! a float.

/// Normalize a locale-ambiguous monetary string into a float.
///
/// Rules, checked in order:
/// 1. Exactly one comma and no period: the comma is a thousands separator
///    when exactly three digits follow it, otherwise a decimal separator.
/// 2. Both separators present with the comma after the period: periods are
///    thousands separators, the comma is the decimal separator.
/// 3. Anything else: commas are thousands separators, periods stay.
///
/// Returns `None` when the cleaned string still fails to parse; callers
/// treat that as an absent field, never an error.
pub fn normalize_amount(raw_value: &str) -> Option<f64> {
    let has_period = raw_value.contains('.');
    let comma_count = raw_value.matches(',').count();

    let cleaned = if !has_period && comma_count == 1 {
        match raw_value.split_once(',') {
            Some((_, after)) if after.len() == 3 => raw_value.replace(',', ""),
            _ => raw_value.replace(',', "."),
        }
    } else if has_period
        && comma_count > 0
        && raw_value.find(',') > raw_value.find('.')
    {
        raw_value.replace('.', "").replace(',', ".")
    } else {
        raw_value.replace(',', "")
    };

    cleaned.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_normalizes(raw: &str, expected: f64) {
        let value = normalize_amount(raw)
            .unwrap_or_else(|| panic!("expected {:?} to normalize", raw));
        assert!(
            (value - expected).abs() < f64::EPSILON,
            "{:?} normalized to {}, expected {}",
            raw,
            value,
            expected
        );
    }

    #[test]
    fn comma_decimal_with_period_thousands() {
        assert_normalizes("1.234,56", 1234.56);
        assert_normalizes("12.345.678,90", 12345678.90);
    }

    #[test]
    fn single_comma_followed_by_three_digits_is_thousands() {
        assert_normalizes("1,234", 1234.0);
        assert_normalizes("12,500", 12500.0);
    }

    #[test]
    fn single_comma_otherwise_is_decimal() {
        assert_normalizes("12,5", 12.5);
        assert_normalizes("12,50", 12.50);
        assert_normalizes("0,5999", 0.5999);
    }

    #[test]
    fn repeated_commas_are_thousands() {
        assert_normalizes("1,234,567", 1_234_567.0);
        assert_normalizes("1,234,567.89", 1_234_567.89);
    }

    #[test]
    fn plain_period_decimal_untouched() {
        assert_normalizes("1234.56", 1234.56);
        assert_normalizes("120.00", 120.0);
    }

    #[test]
    fn bare_integer() {
        assert_normalizes("1200", 1200.0);
    }

    #[test]
    fn garbage_is_unparseable() {
        assert_eq!(normalize_amount("EUR --"), None);
        assert_eq!(normalize_amount(""), None);
        assert_eq!(normalize_amount("12,3,4.5,6"), None);
    }

    #[test]
    fn currency_suffix_is_unparseable() {
        // Normalization does not strip currency symbols; the fallback pass
        // is what recovers these values verbatim for the VAT column.
        assert_eq!(normalize_amount("19,00 EUR"), None);
    }
}
