//! Identifier newtypes that travel through the login and logout handshakes.

use serde::{Deserialize, Serialize};

/// SAML entity ID of an identity provider or of this service provider.
///
/// Entity IDs are opaque, usually URL-shaped strings. Exactly one handler
/// exists per entity ID within a running service provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a new entity ID from a string.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the entity ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque value round-tripped through a login or logout handshake.
///
/// The orchestrator never interprets it; it is carried from the initiating
/// request to the final result unchanged. Endpoint adapters decide whether it
/// is safe to redirect to, typically with [`RelayState::is_local_path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayState(String);

impl RelayState {
    /// Creates a relay state from a string.
    #[must_use]
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Returns the relay state as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the relay state, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns true if the value is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if the value is a same-origin absolute path.
    ///
    /// Accepts `/dashboard?tab=1`; rejects absolute URLs, scheme-relative
    /// `//host` forms and backslash variants that some browsers normalise to
    /// `//`.
    #[must_use]
    pub fn is_local_path(&self) -> bool {
        let value = self.0.as_str();
        value.starts_with('/')
            && !value.starts_with("//")
            && !value.contains('\\')
            && !value.chars().any(char::is_control)
    }
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RelayState {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RelayState {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_display() {
        let id = EntityId::new("https://idp.example.com/metadata".to_string());
        assert_eq!(id.to_string(), "https://idp.example.com/metadata");
    }

    #[test]
    fn entity_id_from_str() {
        let id: EntityId = "idp-a".into();
        assert_eq!(id.as_str(), "idp-a");
    }

    #[test]
    fn relay_state_is_passed_through_verbatim() {
        let raw = "/reports?range=7d&sort=desc#top";
        let relay: RelayState = raw.into();
        assert_eq!(relay.as_str(), raw);
        assert_eq!(relay.into_inner(), raw);
    }

    #[test]
    fn local_paths_are_accepted() {
        assert!(RelayState::from("/").is_local_path());
        assert!(RelayState::from("/dashboard?tab=1").is_local_path());
    }

    #[test]
    fn off_site_targets_are_rejected() {
        assert!(!RelayState::from("https://evil.example.com/").is_local_path());
        assert!(!RelayState::from("//evil.example.com").is_local_path());
        assert!(!RelayState::from("/\\evil.example.com").is_local_path());
        assert!(!RelayState::from("dashboard").is_local_path());
        assert!(!RelayState::from("").is_local_path());
        assert!(!RelayState::from("/\tjavascript:alert(1)").is_local_path());
    }

    #[test]
    fn serde_is_transparent() {
        let relay = RelayState::from("/next");
        let json = serde_json::to_string(&relay).expect("serialize");
        assert_eq!(json, "\"/next\"");
    }
}
