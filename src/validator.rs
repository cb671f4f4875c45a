use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

static EMAIL_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

/// Collects field errors; the first message recorded for a field wins.
#[derive(Debug, Default)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, key: &str, message: &str) {
        self.errors
            .entry(key.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn check(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_error(key, message);
        }
    }

    pub fn into_errors(self) -> BTreeMap<String, String> {
        self.errors
    }

    /// `Ok(())` when no checks failed, otherwise a 422 error carrying every field message.
    pub fn finish(self) -> Result<(), crate::error::ApiError> {
        if self.valid() {
            Ok(())
        } else {
            Err(crate::error::ApiError::failed_validation(self.errors))
        }
    }

    pub fn permitted_value<T: PartialEq + ?Sized>(value: &T, permitted: &[&T]) -> bool {
        permitted.iter().any(|p| *p == value)
    }

    pub fn matches_email(value: &str) -> bool {
        EMAIL_RX.is_match(value)
    }

    pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
        let distinct: HashSet<&T> = values.iter().collect();
        distinct.len() == values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_error_per_field_wins() {
        let mut v = Validator::new();
        v.check(false, "title", "must be provided");
        v.check(false, "title", "must not be more than 500 bytes long");
        let errors = v.into_errors();
        assert_eq!(errors["title"], "must be provided");
    }

    #[test]
    fn email_pattern() {
        assert!(Validator::matches_email("alice@example.com"));
        assert!(!Validator::matches_email("alice@"));
        assert!(!Validator::matches_email("not an email"));
    }

    #[test]
    fn uniqueness_and_safelists() {
        assert!(Validator::unique(&["drama", "comedy"]));
        assert!(!Validator::unique(&["drama", "drama"]));
        assert!(Validator::permitted_value("id", &["id", "-id"]));
        assert!(!Validator::permitted_value("name", &["id", "-id"]));
    }
}
