//! Income/expense classification from keywords and sign.
//!
//! Priority: cancellation > negative sign > income words > expense words
//! > card transfer > positive default.

use tally_core::Operation;

const CANCELLATION_MARKER: &str = "otmena";
const CARD_TRANSFER_MARKER: &str = "perevod na kartu";

const INCOME_MARKERS: &[&str] = &["поступлен", "zachisl", "zachislenie", "popolnen"];
const EXPENSE_MARKERS: &[&str] = &["xarid", "pokupka", "списан", "spisan", "oplata", "platezh"];

/// Classify one notification. `text` is the full segment, matched case-insensitively.
pub fn classify(text: &str, amount: f64) -> Operation {
    let low = text.to_lowercase();

    // A cancellation reverses the original charge, so a positive amount
    // comes back to the account.
    if low.contains(CANCELLATION_MARKER) {
        return Operation::from_sign(amount);
    }

    if amount < 0.0 {
        return Operation::Expense;
    }

    if contains_any(&low, INCOME_MARKERS) {
        Operation::Income
    } else if contains_any(&low, EXPENSE_MARKERS) || low.contains(CARD_TRANSFER_MARKER) {
        Operation::Expense
    } else if amount > 0.0 {
        Operation::Income
    } else {
        Operation::Unknown
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_follows_sign() {
        assert_eq!(classify("OTMENA E-Com oplata: 5000 UZS", 5000.0), Operation::Income);
        assert_eq!(classify("OTMENA E-Com oplata: -5000 UZS", -5000.0), Operation::Expense);
        assert_eq!(classify("Otmena 0 UZS", 0.0), Operation::Unknown);
    }

    #[test]
    fn test_cancellation_beats_income_words() {
        assert_eq!(classify("otmena zachislenie", -10.0), Operation::Expense);
    }

    #[test]
    fn test_negative_is_expense_regardless_of_words() {
        assert_eq!(classify("Popolnenie scheta", -1.0), Operation::Expense);
        assert_eq!(classify("no keywords", -300.0), Operation::Expense);
    }

    #[test]
    fn test_income_words() {
        assert_eq!(classify("Zachislenie sredstv", 100.0), Operation::Income);
        assert_eq!(classify("Поступление на карту", 100.0), Operation::Income);
        assert_eq!(classify("POPOLNENIE", 100.0), Operation::Income);
    }

    #[test]
    fn test_expense_words() {
        assert_eq!(classify("Pokupka: MAKRO", 15000.0), Operation::Expense);
        assert_eq!(classify("XARID: korzinka", 1.0), Operation::Expense);
        assert_eq!(classify("Списание", 1.0), Operation::Expense);
        assert_eq!(classify("E-Com oplata:", 1.0), Operation::Expense);
        assert_eq!(classify("Platezh: Beeline", 1.0), Operation::Expense);
    }

    #[test]
    fn test_income_words_win_over_expense_words() {
        assert_eq!(classify("Pokupka vozvrat, zachislenie", 10.0), Operation::Income);
    }

    #[test]
    fn test_card_transfer_is_expense_unless_income() {
        assert_eq!(classify("Perevod na kartu: 8600***1234", 500.0), Operation::Expense);
        assert_eq!(classify("Perevod na kartu: zachislenie", 500.0), Operation::Income);
        assert_eq!(classify("Perevod na kartu:", 0.0), Operation::Expense);
    }

    #[test]
    fn test_unlabelled_defaults() {
        assert_eq!(classify("Balans", 42.0), Operation::Income);
        assert_eq!(classify("Balans", 0.0), Operation::Unknown);
    }
}
