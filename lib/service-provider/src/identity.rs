//! The authenticated principal carried by an accepted assertion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Assertion attributes: attribute name to its (possibly multiple) values.
pub type Attributes = BTreeMap<String, Vec<String>>;

/// An authenticated principal as asserted by an identity provider.
///
/// The subject is the assertion's `NameID`; the attribute mapping is opaque to
/// the orchestrator and passed through to the session unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The `NameID` value of the assertion subject.
    subject: String,
    /// The `NameID` format, if the identity provider stated one.
    name_id_format: Option<String>,
    /// Attributes from the assertion's attribute statements.
    #[serde(default)]
    attributes: Attributes,
}

impl Identity {
    /// Creates an identity with no attributes.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            name_id_format: None,
            attributes: Attributes::new(),
        }
    }

    /// Sets the `NameID` format.
    #[must_use]
    pub fn with_name_id_format(mut self, format: Option<String>) -> Self {
        self.name_id_format = format;
        self
    }

    /// Sets the attribute mapping.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Returns the subject `NameID` value.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the `NameID` format, if known.
    #[must_use]
    pub fn name_id_format(&self) -> Option<&str> {
        self.name_id_format.as_deref()
    }

    /// Returns all attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Returns the values of a single attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    /// Returns the first value of an attribute.
    #[must_use]
    pub fn first_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        let mut attributes = Attributes::new();
        attributes.insert(
            "email".to_string(),
            vec!["alice@example.com".to_string()],
        );
        attributes.insert(
            "groups".to_string(),
            vec!["staff".to_string(), "admins".to_string()],
        );
        Identity::new("alice")
            .with_name_id_format(Some(
                "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress".to_string(),
            ))
            .with_attributes(attributes)
    }

    #[test]
    fn attribute_lookup() {
        let identity = alice();
        assert_eq!(identity.subject(), "alice");
        assert_eq!(identity.first_attribute("email"), Some("alice@example.com"));
        assert_eq!(
            identity.attribute("groups"),
            Some(["staff".to_string(), "admins".to_string()].as_slice())
        );
        assert_eq!(identity.attribute("missing"), None);
    }

    #[test]
    fn deserializes_without_attributes() {
        let json = r#"{"subject": "bob", "name_id_format": null}"#;
        let identity: Identity = serde_json::from_str(json).expect("deserialize");
        assert_eq!(identity.subject(), "bob");
        assert!(identity.attributes().is_empty());
    }
}
