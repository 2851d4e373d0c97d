//! Generative extraction — the best-effort first stage.
//!
//! The backend is prompted for a four-key JSON object, but its reply is
//! never trusted to be clean JSON: the `{...}` span is cut out of whatever
//! came back and each field is recovered with its own scoped lookup. A
//! missing key yields an empty field, not a parse failure.

use std::sync::OnceLock;

use regex::Regex;

use crate::fields::{parse_amount, RecoveredFields};

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_amount_field, r#""amount"\s*:\s*"([^"]+)""#);
re!(re_merchant_field, r#""merchant"\s*:\s*"([^"]+)""#);
re!(re_reference_field, r#""reference"\s*:\s*"([^"]+)""#);
re!(re_account_field, r#""account"\s*:\s*"([^"]+)""#);

/// The instruction template sent to the backend. The wording is fixed — the
/// deployed model was tuned against exactly this shape, and the reply format
/// check in [`parse_response`] depends on it.
pub fn build_prompt(body: &str) -> String {
    format!(
        r#"Extract transaction information from this bank SMS and respond ONLY with a JSON object:

SMS: "{body}"

Extract these fields:
- amount: numeric value only (no currency symbols)
- merchant: recipient/merchant name
- reference: transaction reference/ID
- account: last 4 digits of account

Respond with ONLY this JSON format:
{{"amount":"[number]","merchant":"[name]","reference":"[ref]","account":"[digits]"}}

JSON:"#
    )
}

/// Cut the `{...}` span out of the reply. Models routinely wrap the object
/// in prose or code fences; everything outside the braces is dropped.
fn sanitize(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

fn field<'a>(pattern: &Regex, fragment: &'a str) -> Option<&'a str> {
    pattern
        .captures(fragment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Validate a backend reply into recovered fields.
///
/// Returns `None` — voiding the whole generative attempt — unless the amount
/// parses as a non-negative number and the merchant is non-blank and not the
/// literal "null" (a known model artifact). Reference and account are never
/// required.
pub fn parse_response(response: &str) -> Option<RecoveredFields> {
    let fragment = sanitize(response)?;

    let amount = field(re_amount_field(), fragment).and_then(parse_amount)?;
    if amount.is_sign_negative() {
        return None;
    }

    let merchant = field(re_merchant_field(), fragment)?.trim();
    if merchant.is_empty() || merchant == "null" {
        return None;
    }

    Some(RecoveredFields {
        amount: Some(amount),
        merchant: Some(merchant.to_string()),
        reference: field(re_reference_field(), fragment).map(|s| s.trim().to_string()),
        account: field(re_account_field(), fragment).map(|s| s.trim().to_string()),
    })
}
