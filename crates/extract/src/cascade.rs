//! Deterministic pattern cascade — the fallback extraction stage.
//!
//! Each field has an ordered list of patterns; the first pattern that yields
//! a usable value wins. The ordering is a priority policy (e.g. payee before
//! payer for the merchant field) and must not be reshuffled.

use std::sync::OnceLock;

use regex::Regex;

use crate::fields::{parse_amount, RecoveredFields};
use rust_decimal::Decimal;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Amount: currency marker first, bare labels last.
re!(re_amount_marker_prefix, r"(?:Rs\.?|INR|₹)\s*([0-9,]+\.?[0-9]*)");
re!(re_amount_marker_suffix, r"([0-9,]+\.?[0-9]*)\s*(?:Rs\.?|INR|₹)");
re!(re_amount_label, r"(?i)amount[\s:]*(?:Rs\.?|INR|₹)?\s*([0-9,]+\.?[0-9]*)");
re!(re_amount_sent, r"(?i)sent\s+(?:Rs\.?|INR|₹)?\s*([0-9,]+\.?[0-9]*)");

// Account: the "A/C" marker is uppercase in every known format, so the first
// pattern is deliberately case-sensitive.
re!(re_account_marker, r"A/C[\s*]+([0-9X*]+)");
re!(re_account_from, r"(?i)from\s+[A-Z\s]+A/C[\s*]+([0-9X*]+)");
re!(re_account_label, r"(?i)account[\s*]+([0-9X*]+)");

re!(re_reference_label, r"(?i)(?:Ref|UPI Ref|Txn|Transaction|Reference)[\s:]+([A-Z0-9]+)");
re!(re_reference_utr, r"(?i)UTR[\s:]*([A-Z0-9]+)");
re!(re_reference_txn, r"(?i)TXN[\s:]*([A-Z0-9]+)");

// Merchant: "To" before "From" so the payee beats the payer when a message
// names both.
re!(re_merchant_to, r"(?i)To\s+([A-Z0-9\s]+?)(?:\s+On|\s+UPI|\s+A/C|\s*$)");
re!(re_merchant_paid_to, r"(?i)(?:paid to|sent to)\s+([A-Z0-9\s]+?)(?:\s+on|\s+via|\s+from)");
re!(re_merchant_label, r"(?i)merchant[\s:]+([A-Z0-9\s]+)");
re!(re_merchant_from, r"(?i)FROM\s+([A-Z0-9\s]+?)(?:\s+On|\s+UPI|\s+A/C)");
re!(re_merchant_fallback, r"(?i)(?:TO|FROM)\s+([A-Z][A-Z0-9\s]{2,})");

fn amount_patterns() -> [&'static Regex; 4] {
    [
        re_amount_marker_prefix(),
        re_amount_marker_suffix(),
        re_amount_label(),
        re_amount_sent(),
    ]
}

fn account_patterns() -> [&'static Regex; 3] {
    [re_account_marker(), re_account_from(), re_account_label()]
}

fn reference_patterns() -> [&'static Regex; 3] {
    [re_reference_label(), re_reference_utr(), re_reference_txn()]
}

fn merchant_patterns() -> [&'static Regex; 4] {
    [
        re_merchant_to(),
        re_merchant_paid_to(),
        re_merchant_label(),
        re_merchant_from(),
    ]
}

// ── Per-field cascades ───────────────────────────────────────────────────────

/// Run every field cascade over the body.
pub fn extract_fields(body: &str) -> RecoveredFields {
    RecoveredFields {
        amount: extract_amount(body),
        merchant: extract_merchant(body),
        reference: extract_reference(body),
        account: extract_account(body),
    }
}

fn extract_amount(body: &str) -> Option<Decimal> {
    for pattern in amount_patterns() {
        if let Some(caps) = pattern.captures(body) {
            // A match that fails numeric parse falls through to the next rank.
            if let Some(amount) = parse_amount(&caps[1]) {
                return Some(amount);
            }
        }
    }
    None
}

fn extract_account(body: &str) -> Option<String> {
    account_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(body))
        .map(|caps| caps[1].to_string())
}

fn extract_reference(body: &str) -> Option<String> {
    reference_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(body))
        .map(|caps| caps[1].to_string())
}

fn extract_merchant(body: &str) -> Option<String> {
    for pattern in merchant_patterns() {
        if let Some(caps) = pattern.captures(body) {
            let merchant = caps[1].trim();
            if !merchant.is_empty() {
                return Some(merchant.to_string());
            }
        }
    }
    // Last resort: any capitalized run after TO/FROM.
    re_merchant_fallback()
        .captures(body)
        .map(|caps| caps[1].trim().to_string())
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ── Amount ───────────────────────────────────────────────────────────────

    #[test]
    fn amount_marker_prefix() {
        assert_eq!(
            extract_amount("Rs. 500.00 debited from A/C XX1234"),
            Some(dec("500.00"))
        );
        assert_eq!(extract_amount("INR 42 spent"), Some(dec("42")));
        assert_eq!(extract_amount("₹99.50 paid"), Some(dec("99.50")));
    }

    #[test]
    fn amount_strips_thousands_separators() {
        assert_eq!(
            extract_amount("Rs. 12,345.50 debited"),
            Some(dec("12345.50"))
        );
    }

    #[test]
    fn amount_marker_suffix() {
        assert_eq!(
            extract_amount("You paid 1,250.00 INR to the grocer"),
            Some(dec("1250.00"))
        );
    }

    #[test]
    fn amount_label_without_marker() {
        assert_eq!(extract_amount("amount 330 debited"), Some(dec("330")));
        assert_eq!(extract_amount("Amount: 75.25"), Some(dec("75.25")));
    }

    #[test]
    fn amount_sent_label() {
        assert_eq!(extract_amount("You have sent 120 to mom via UPI"), Some(dec("120")));
    }

    #[test]
    fn amount_marker_outranks_labels() {
        // Both a "sent" label and a currency marker are present; the marker
        // pattern is first in the cascade.
        assert_eq!(
            extract_amount("sent 300 but charged Rs. 500"),
            Some(dec("500"))
        );
    }

    #[test]
    fn amount_absent() {
        assert_eq!(extract_amount("Your OTP is 4532"), None);
    }

    // ── Account ──────────────────────────────────────────────────────────────

    #[test]
    fn account_after_marker() {
        assert_eq!(
            extract_account("debited from A/C XX1234 on 12-01"),
            Some("XX1234".to_string())
        );
        assert_eq!(
            extract_account("A/C **5678 debited"),
            Some("5678".to_string())
        );
    }

    #[test]
    fn account_label_lowercase() {
        assert_eq!(
            extract_account("your account 1234567 was debited"),
            Some("1234567".to_string())
        );
    }

    #[test]
    fn account_absent() {
        assert_eq!(extract_account("Rs. 500 paid To SUPERMART"), None);
    }

    // ── Reference ────────────────────────────────────────────────────────────

    #[test]
    fn reference_upi_ref() {
        assert_eq!(
            extract_reference("UPI Ref 123456789012"),
            Some("123456789012".to_string())
        );
    }

    #[test]
    fn reference_utr() {
        assert_eq!(
            extract_reference("credited. UTR:AXIR12345"),
            Some("AXIR12345".to_string())
        );
    }

    #[test]
    fn reference_txn() {
        assert_eq!(
            extract_reference("TXN 998877 successful"),
            Some("998877".to_string())
        );
    }

    // ── Merchant ─────────────────────────────────────────────────────────────

    #[test]
    fn merchant_payee_beats_payer() {
        let body = "Rs. 120 debited To SUPERMART On 12-01 UPI A/C 1234 From JOHN DOE";
        assert_eq!(extract_merchant(body), Some("SUPERMART".to_string()));
    }

    #[test]
    fn merchant_to_is_case_insensitive() {
        assert_eq!(
            extract_merchant("paid to BIG BAZAAR on 03-02 via UPI"),
            Some("BIG BAZAAR".to_string())
        );
    }

    #[test]
    fn merchant_sent_to_terminated_by_via() {
        // The "To" pattern cannot terminate here (no On/UPI/A/C follows and
        // the trailing period blocks end-of-string), so rank 2 resolves it.
        assert_eq!(
            extract_merchant("sent to RELIANCE FRESH via card ending 1234."),
            Some("RELIANCE FRESH".to_string())
        );
    }

    #[test]
    fn merchant_from_is_last_rank() {
        // No payee-oriented pattern matches, so the payer is used.
        assert_eq!(
            extract_merchant("Rs. 99 received FROM ACME CORP UPI Ref 42"),
            Some("ACME CORP".to_string())
        );
    }

    #[test]
    fn merchant_to_at_end_of_body() {
        assert_eq!(
            extract_merchant("Rs. 250 sent To SWIGGY"),
            Some("SWIGGY".to_string())
        );
    }

    #[test]
    fn merchant_fallback_heuristic() {
        // "To SWIGGY." is not terminated by any ranked terminator, so only
        // the fallback run matches.
        assert_eq!(
            extract_merchant("Payment done TO SWIGGY."),
            Some("SWIGGY".to_string())
        );
    }

    #[test]
    fn merchant_absent() {
        assert_eq!(extract_merchant("Your OTP is 4532"), None);
    }

    // ── Whole-body extraction ────────────────────────────────────────────────

    #[test]
    fn full_upi_debit_alert() {
        let body = "Rs. 500.00 debited from A/C XX1234 To SUPERMART On 12-01-24 UPI Ref 123456789012";
        let fields = extract_fields(body);
        assert_eq!(fields.amount, Some(dec("500.00")));
        assert_eq!(fields.merchant.as_deref(), Some("SUPERMART"));
        assert_eq!(fields.account.as_deref(), Some("XX1234"));
        assert_eq!(fields.reference.as_deref(), Some("123456789012"));
        assert!(fields.is_complete());
    }

    #[test]
    fn otp_body_resolves_nothing_required() {
        let fields = extract_fields("Your OTP is 4532. Do not share it with anyone.");
        assert!(!fields.is_complete());
        assert_eq!(fields.amount, None);
        assert_eq!(fields.merchant, None);
    }
}
