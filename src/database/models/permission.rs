use serde::Serialize;
use std::collections::BTreeSet;

/// Capability codes granted to a user, e.g. `movies:read`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Permissions(BTreeSet<String>);

impl Permissions {
    pub fn includes(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Permissions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_only_granted_codes() {
        let permissions: Permissions = ["movies:read"].into_iter().collect();
        assert!(permissions.includes("movies:read"));
        assert!(!permissions.includes("movies:write"));
        assert!(!permissions.includes("movies"));
    }
}
