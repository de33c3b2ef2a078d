//! Outcome values exchanged between handlers, the orchestrator and adapters.
//!
//! Every expected protocol result is a variant here rather than an error, so
//! callers decide presentation and tests can assert on plain data.

use serde::Serialize;
use url::Url;

use crate::entity::{EntityId, RelayState};
use crate::identity::Identity;

/// Result of one handler attempting to consume one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionOutcome {
    /// The message is a valid response from this identity provider and the
    /// user is authorized.
    Accepted {
        /// The authenticated principal, including its attributes.
        identity: Identity,
        /// SAML `SessionIndex` from the authentication statement.
        session_index: Option<String>,
    },
    /// This handler cannot interpret the message. The next handler is tried.
    NotApplicable {
        /// Why the handler rejected the message.
        reason: String,
    },
    /// The message belongs to this handler and is well formed, but the user is
    /// not authorized. No further handlers are tried.
    Denied {
        /// Why the user was denied.
        reason: String,
    },
}

impl AssertionOutcome {
    /// Shorthand for a `NotApplicable` outcome.
    #[must_use]
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Self::NotApplicable {
            reason: reason.into(),
        }
    }

    /// Shorthand for a `Denied` outcome.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }
}

/// Why one handler could not interpret an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerRejection {
    /// The handler's identity provider.
    pub entity_id: EntityId,
    /// The handler's reason.
    pub reason: String,
}

impl HandlerRejection {
    /// Creates a rejection record.
    #[must_use]
    pub fn new(entity_id: EntityId, reason: impl Into<String>) -> Self {
        Self {
            entity_id,
            reason: reason.into(),
        }
    }
}

/// Result of consuming an assertion across all configured handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginResult {
    /// A handler accepted the assertion and the session was established.
    LoggedIn {
        /// The authenticated principal.
        identity: Identity,
        /// The relay state from the inbound request, unchanged.
        relay_state: Option<RelayState>,
    },
    /// A handler recognised the assertion but denied the user.
    Unauthorized {
        /// The identity provider whose handler denied the user.
        entity_id: EntityId,
        /// The handler's reason.
        reason: String,
        /// The relay state from the inbound request, unchanged.
        relay_state: Option<RelayState>,
    },
    /// No handler could interpret the assertion.
    NoHandlerApplicable {
        /// Every handler's reason, in configured order.
        errors: Vec<HandlerRejection>,
    },
}

/// Result of starting an SP-initiated logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutInitiation {
    /// The local session was cleared; send the browser here to log out at the
    /// identity provider.
    Redirect(Url),
    /// There was no session to log out of.
    NotLoggedIn,
}

/// Result of one handler attempting to interpret an inbound logout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutRequestOutcome {
    /// The request is a well-formed logout request from this identity provider.
    Recognized {
        /// The request's `ID`, for `InResponseTo` in the acknowledgment.
        request_id: Option<String>,
        /// The `SessionIndex` the identity provider is ending, if given.
        session_index: Option<String>,
    },
    /// This handler cannot interpret the request.
    NotApplicable {
        /// Why the handler rejected the request.
        reason: String,
    },
}

/// Positive acknowledgment of an IdP-initiated logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutAck {
    /// The identity provider that sent the logout request.
    pub entity_id: EntityId,
    /// The logout request's `ID`.
    pub in_response_to: Option<String>,
    /// The relay state from the inbound request, unchanged.
    pub relay_state: Option<RelayState>,
}

/// Result of handling an IdP-initiated single logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleLogoutResult {
    /// The request was recognised and the local session is cleared.
    Acknowledged(LogoutAck),
    /// No handler recognised the request; the local session is untouched.
    Unrecognized {
        /// Every handler's reason, in configured order.
        errors: Vec<HandlerRejection>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_rejection_serializes_for_renderers() {
        let rejection = HandlerRejection::new(EntityId::from("idp-a"), "wrong issuer");
        let json = serde_json::to_value(&rejection).expect("serialize");
        assert_eq!(json["entity_id"], "idp-a");
        assert_eq!(json["reason"], "wrong issuer");
    }
}
