//! Currency helpers.

/// Currency used when a source name is too short to carry a code.
pub const FALLBACK_CURRENCY: &str = "XXX";

/// Currencies recognized next to amounts in bank notifications.
pub const NOTIFICATION_CURRENCIES: [&str; 4] = ["UZS", "RUB", "USD", "EUR"];

/// Derive a currency code from a source name such as "Humo UZS".
///
/// Sources are named with the currency as their last three characters.
pub fn currency_from_source(source: &str, fallback: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    if chars.len() < 3 {
        return fallback.to_string();
    }
    chars[chars.len() - 3..]
        .iter()
        .collect::<String>()
        .to_uppercase()
}
