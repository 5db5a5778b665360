use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Non-owning reference to an entity held by the surrounding application.
///
/// Handles are resolved against a [`crate::scene::Scene`] on every use, so an
/// entity removed from the scene simply stops resolving.
#[derive(Eq, PartialEq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct EntityHandle(String);

impl EntityHandle {
    /// Creates a handle backed by a random UUID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for EntityHandle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_handles_differ() {
        assert_ne!(EntityHandle::new(), EntityHandle::new());
    }

    #[test]
    fn test_named_handle() {
        let h = EntityHandle::from("FixedROI");
        assert_eq!(h.as_str(), "FixedROI");
        assert_eq!(h.to_string(), "FixedROI");
    }
}
