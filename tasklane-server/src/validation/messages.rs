//! Message catalogs keyed by rule name
//!
//! Templates may use `{field}` and `{param}`. Rules without an entry fall
//! back to [`FALLBACK`].

use super::Rule;

/// Used when a catalog has no entry for a rule.
pub const FALLBACK: &str = "Field '{field}' is not valid.";

/// Rule name to message template lookup
#[derive(Debug)]
pub struct Catalog {
    entries: &'static [(&'static str, &'static str)],
}

impl Catalog {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    fn template(&self, rule: &str) -> &'static str {
        self.entries
            .iter()
            .find(|(name, _)| *name == rule)
            .map_or(FALLBACK, |(_, template)| template)
    }

    /// Render the message for `field` failing `rule`.
    pub fn render(&self, field: &str, rule: Rule) -> String {
        let param = rule.param().map(|n| n.to_string()).unwrap_or_default();
        self.template(rule.name())
            .replace("{field}", field)
            .replace("{param}", &param)
    }
}

pub static TODO_MESSAGES: Catalog = Catalog::new(&[
    ("required", "Field '{field}' is 'required'."),
    (
        "status",
        "Field '{field}' must be one of: pending, in_progress, completed",
    ),
    ("min", "Field '{field}' is too short (minimum {param} characters)"),
    ("max", "Field '{field}' is too long (maximum {param} characters)"),
]);

pub static USER_MESSAGES: Catalog = Catalog::new(&[
    ("required", "Field '{field}' is 'required'."),
    ("min", "Field '{field}' is too short (minimum {param} characters)"),
    ("max", "Field '{field}' is too long (maximum {param} characters)"),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_rules() {
        assert_eq!(
            TODO_MESSAGES.render("title", Rule::Min(3)),
            "Field 'title' is too short (minimum 3 characters)"
        );
        assert_eq!(
            TODO_MESSAGES.render("status", Rule::Status),
            "Field 'status' must be one of: pending, in_progress, completed"
        );
    }

    #[test]
    fn unknown_rules_use_fallback() {
        assert_eq!(
            USER_MESSAGES.render("phone", Rule::Phone),
            "Field 'phone' is not valid."
        );
        assert_eq!(
            TODO_MESSAGES.render("email", Rule::Email),
            "Field 'email' is not valid."
        );
    }
}
