//! Field predicates
//!
//! Pure functions over a single field value. Empty-value handling is the
//! engine's concern, not theirs.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::todo::TODO_STATUSES;
use crate::models::user::GENDERS;

/// Digits with optional separators, at least one digit.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[- +()]*[0-9][- +()0-9]*$").expect("invalid phone regex"));

/// Lowercase local part, dotted domain, 2-4 letter TLD.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,4}$").expect("invalid email regex")
});

pub fn is_present(value: &str) -> bool {
    !value.is_empty()
}

/// At least `min` characters (Unicode scalar values, not bytes).
pub fn has_min_chars(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

/// At most `max` characters (Unicode scalar values, not bytes).
pub fn has_max_chars(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

pub fn is_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
}

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub fn is_gender(value: &str) -> bool {
    GENDERS.contains(&value)
}

pub fn is_todo_status(value: &str) -> bool {
    TODO_STATUSES.contains(&value)
}
