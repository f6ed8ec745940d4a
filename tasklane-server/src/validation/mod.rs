//! Request validation
//!
//! Each request shape lists its fields with an ordered set of [`Rule`]s.
//! A [`Validator`] walks that list, renders one message per failing field
//! from its catalog and returns every failure at once.
//!
//! Empty values are only checked when the field carries [`Rule::Required`];
//! otherwise an empty value means "not supplied" and the field is skipped.

pub mod messages;
pub mod rules;

use serde::Serialize;
use std::fmt;

pub use messages::Catalog;

/// A single check applied to a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    /// Minimum length in characters
    Min(usize),
    /// Maximum length in characters
    Max(usize),
    Email,
    Phone,
    Gender,
    /// Todo status enumeration
    Status,
}

impl Rule {
    /// Name used to look up the message template.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Gender => "gender",
            Self::Status => "status",
        }
    }

    /// Rule parameter, substituted for `{param}` in templates.
    pub fn param(&self) -> Option<usize> {
        match self {
            Self::Min(n) | Self::Max(n) => Some(*n),
            _ => None,
        }
    }

    pub fn check(&self, value: &str) -> bool {
        match self {
            Self::Required => rules::is_present(value),
            Self::Min(n) => rules::has_min_chars(value, *n),
            Self::Max(n) => rules::has_max_chars(value, *n),
            Self::Email => rules::is_email(value),
            Self::Phone => rules::is_phone(value),
            Self::Gender => rules::is_gender(value),
            Self::Status => rules::is_todo_status(value),
        }
    }
}

/// One field of a request together with the rules it must satisfy
#[derive(Debug, Clone, Copy)]
pub struct FieldRules<'a> {
    pub field: &'static str,
    pub value: &'a str,
    pub rules: &'static [Rule],
}

impl<'a> FieldRules<'a> {
    pub fn new(field: &'static str, value: &'a str, rules: &'static [Rule]) -> Self {
        Self { field, value, rules }
    }

    /// First rule this field fails, if any.
    fn first_failure(&self) -> Option<Rule> {
        if self.value.is_empty() && !self.rules.contains(&Rule::Required) {
            return None;
        }
        self.rules.iter().copied().find(|rule| !rule.check(self.value))
    }
}

/// Implemented by request payloads that can be validated
pub trait Validate {
    /// Fields in the order their errors should be reported.
    fn fields(&self) -> Vec<FieldRules<'_>>;
}

/// One failing field, as rendered on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every failing field of one payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }

    /// Message reported for `field`, if it failed.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.iter().map(|e| e.field.as_str()).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Runs rule lists and renders failures with a message catalog
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    catalog: &'static Catalog,
}

impl Validator {
    pub const fn new(catalog: &'static Catalog) -> Self {
        Self { catalog }
    }

    /// Validator with the todo message catalog.
    pub fn todos() -> Self {
        Self::new(&messages::TODO_MESSAGES)
    }

    /// Validator with the user message catalog.
    pub fn users() -> Self {
        Self::new(&messages::USER_MESSAGES)
    }

    pub fn validate(&self, input: &impl Validate) -> Result<(), ValidationErrors> {
        let errors: Vec<FieldError> = input
            .fields()
            .into_iter()
            .filter_map(|field| {
                field.first_failure().map(|rule| FieldError {
                    field: field.field.to_owned(),
                    message: self.catalog.render(field.field, rule),
                })
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}
