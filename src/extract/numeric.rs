/// Characters used as thousands separators in the scraped figures.
const THOUSANDS_SEPARATORS: [char; 5] = [',', ' ', '\'', '\u{a0}', '\u{202f}'];

/// Reads a market-cap cell such as `"1,234.5"` as a number.
///
/// Returns `None` for anything that is not a finite decimal once separators
/// are removed; the caller keeps the row with a missing value.
pub fn parse_market_cap(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !THOUSANDS_SEPARATORS.contains(c))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
