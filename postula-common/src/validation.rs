//! Candidate field validation
//!
//! Pure predicates over form input. Nothing here performs I/O or mutates
//! its arguments; every check fails closed (returns `false`) on malformed
//! input instead of erroring.
//!
//! National ids are Chilean RUTs: a run of decimal digits, a hyphen, and a
//! modulo-11 check character (`0`-`9` or `k`).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::record::{Candidate, Field, InvalidFields};

static NATIONAL_ID_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)-([0-9kK])$").expect("Invalid national id pattern"));

// Matched against the lower-cased address.
static EMAIL_GRAMMAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))"#,
        r#"@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-z\-0-9]+\.)+[a-z]{2,}))$"#,
    ))
    .expect("Invalid email pattern")
});

/// Compute the RUT check character for a string of decimal digits
///
/// Each digit, least significant first, is multiplied by the cyclic weight
/// `9 - (m % 6)` and added to a running `sum` that starts at 1 and is
/// reduced modulo 11 after every digit. A final sum of 0 maps to `k`,
/// anything else to the digit `sum - 1`.
///
/// Digits are consumed from the right one character at a time, so the
/// input may be arbitrarily long. Leading zeros leave the sum unchanged.
///
/// Returns `None` if `digits` is empty or contains a non-digit.
pub fn check_digit(digits: &str) -> Option<char> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let significant = digits.trim_start_matches('0');
    let mut sum: u32 = 1;
    for (m, b) in significant.bytes().rev().enumerate() {
        let digit = u32::from(b - b'0');
        let weight = 9 - (m % 6) as u32;
        sum = (sum + digit * weight) % 11;
    }

    match sum {
        0 => Some('k'),
        n => char::from_digit(n - 1, 10),
    }
}

/// True iff `value` is `DIGITS-CHECK` and CHECK matches the computed check character
pub fn is_valid_national_id(value: &str) -> bool {
    let Some(caps) = NATIONAL_ID_SHAPE.captures(value) else {
        return false;
    };

    let given = caps[2].chars().next().map(|c| c.to_ascii_lowercase());
    given.is_some() && check_digit(&caps[1]) == given
}

/// True iff `value` (case-insensitively) matches the address grammar
pub fn is_valid_email(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    EMAIL_GRAMMAR.is_match(&value.to_lowercase())
}

/// True iff the trimmed string is not empty
pub fn is_non_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Check whether a candidate may be persisted
///
/// All five fields are evaluated; the error carries every failing field so
/// the form can flag them at once.
pub fn is_record_persistable(candidate: &Candidate) -> Result<(), InvalidFields> {
    let invalid: InvalidFields = Field::ALL
        .into_iter()
        .filter(|&field| !is_field_valid(field, candidate.get(field)))
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(invalid)
    }
}

fn is_field_valid(field: Field, value: &str) -> bool {
    match field {
        Field::NationalId => is_non_empty(value) && is_valid_national_id(value),
        Field::Email => is_non_empty(value) && is_valid_email(value),
        Field::FullName | Field::Phone | Field::Position => is_non_empty(value),
    }
}
