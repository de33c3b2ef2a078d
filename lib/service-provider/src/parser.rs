//! The response-parser seam.
//!
//! Decoding SAML XML and verifying its signature happens behind
//! [`ResponseParser`]. A parser returns the validated facts of a message; the
//! handler then decides whether those facts mean the message is not for it,
//! the user is denied, or the user is accepted.

use crate::config::IdentityProviderConfig;
use crate::identity::Attributes;
use std::fmt;

/// Top-level status code of a successful SAML response.
pub const STATUS_SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";

/// Verified content of an inbound SAML `Response`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// The `Issuer` of the response or its assertion.
    pub issuer: Option<String>,
    /// The top-level `StatusCode` value.
    pub status_code: String,
    /// The optional `StatusMessage`.
    pub status_message: Option<String>,
    /// The subject `NameID` value.
    pub name_id: Option<String>,
    /// The subject `NameID` format.
    pub name_id_format: Option<String>,
    /// The `SessionIndex` of the authentication statement.
    pub session_index: Option<String>,
    /// Attributes from all attribute statements.
    pub attributes: Attributes,
}

impl ParsedResponse {
    /// Creates a successful response for a subject.
    #[must_use]
    pub fn success(issuer: impl Into<String>, name_id: impl Into<String>) -> Self {
        Self {
            issuer: Some(issuer.into()),
            status_code: STATUS_SUCCESS.to_string(),
            status_message: None,
            name_id: Some(name_id.into()),
            name_id_format: None,
            session_index: None,
            attributes: Attributes::new(),
        }
    }

    /// Sets the status code and message.
    #[must_use]
    pub fn with_status(mut self, code: impl Into<String>, message: Option<String>) -> Self {
        self.status_code = code.into();
        self.status_message = message;
        self
    }

    /// Sets the session index.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_index = Some(index.into());
        self
    }

    /// Adds an attribute value.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Returns true if the top-level status is `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_SUCCESS
    }
}

/// Verified content of an inbound SAML `LogoutRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLogoutRequest {
    /// The request `ID`.
    pub id: Option<String>,
    /// The request `Issuer`.
    pub issuer: Option<String>,
    /// The `NameID` being logged out.
    pub name_id: Option<String>,
    /// The `SessionIndex` being ended.
    pub session_index: Option<String>,
}

/// Why a parser produced no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// The message is not a valid message for this identity provider (bad
    /// encoding, unexpected schema, signature not made by its certificate).
    Malformed { reason: String },
    /// The parser itself failed (key material unavailable, I/O error).
    Internal { details: String },
}

impl ParseFailure {
    /// Shorthand for a `Malformed` failure.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { reason } => write!(f, "malformed message: {reason}"),
            Self::Internal { details } => write!(f, "parser failure: {details}"),
        }
    }
}

impl std::error::Error for ParseFailure {}

/// Decodes and verifies inbound SAML messages for one identity provider.
///
/// Implementations must be synchronous and bounded: they run on the request
/// thread inside the handler trial loop.
pub trait ResponseParser: Send + Sync {
    /// Parses and verifies a `SAMLResponse` form value posted to the ACS.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` when the message cannot be a response from `idp`,
    /// `Internal` when verification could not be attempted.
    fn parse_response(
        &self,
        idp: &IdentityProviderConfig,
        raw_message: &str,
    ) -> Result<ParsedResponse, ParseFailure>;

    /// Parses and verifies a `SAMLRequest` logout request.
    ///
    /// # Errors
    ///
    /// As for [`parse_response`](Self::parse_response).
    fn parse_logout_request(
        &self,
        idp: &IdentityProviderConfig,
        raw_message: &str,
    ) -> Result<ParsedLogoutRequest, ParseFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_builder() {
        let parsed = ParsedResponse::success("https://idp.example.com", "alice")
            .with_session_index("_idx")
            .with_attribute("groups", "staff")
            .with_attribute("groups", "admins");

        assert!(parsed.is_success());
        assert_eq!(parsed.session_index.as_deref(), Some("_idx"));
        assert_eq!(parsed.attributes["groups"], ["staff", "admins"]);
    }

    #[test]
    fn non_success_status() {
        let parsed = ParsedResponse::success("https://idp.example.com", "alice").with_status(
            "urn:oasis:names:tc:SAML:2.0:status:Responder",
            Some("account locked".to_string()),
        );
        assert!(!parsed.is_success());
    }

    #[test]
    fn parse_failure_display() {
        assert!(
            ParseFailure::malformed("bad base64")
                .to_string()
                .contains("bad base64")
        );
        let internal = ParseFailure::Internal {
            details: "key store offline".to_string(),
        };
        assert!(internal.to_string().contains("key store offline"));
    }
}
