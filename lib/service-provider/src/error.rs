//! Error types for the service-provider crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConfigurationError`: Static configuration problems (startup or lookup)
//! - `HandlerError`: Internal faults inside an identity provider handler
//! - `SessionStoreError`: The external session store failed
//! - `RenderError`: The external renderer failed
//! - `ServiceProviderError`: Orchestrator-level context wrapping the above
//!
//! Expected protocol outcomes (a handler that cannot interpret a message, a
//! denied user, a logout without a session) are *not* errors; they are
//! returned as values from the orchestrator.

use crate::entity::EntityId;
use std::fmt;

/// Errors in the service provider or identity provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No identity providers are configured.
    NoIdentityProviders,
    /// Two identity providers share an entity ID.
    DuplicateEntityId { entity_id: EntityId },
    /// More than one identity provider is marked as the default.
    MultipleDefaults { entity_ids: Vec<EntityId> },
    /// A login was requested for an entity ID that is not configured.
    UnknownIdentityProvider { entity_id: EntityId },
    /// The current session references an identity provider that is no
    /// longer configured.
    SessionHandlerMissing { entity_id: EntityId },
    /// A configuration field has an invalid value.
    Invalid { field: String, reason: String },
    /// Configuration sources could not be loaded or deserialized.
    Load { details: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoIdentityProviders => write!(f, "no identity providers are configured"),
            Self::DuplicateEntityId { entity_id } => {
                write!(f, "identity provider '{entity_id}' is configured more than once")
            }
            Self::MultipleDefaults { entity_ids } => {
                let ids: Vec<&str> = entity_ids.iter().map(EntityId::as_str).collect();
                write!(
                    f,
                    "more than one default identity provider: {}",
                    ids.join(", ")
                )
            }
            Self::UnknownIdentityProvider { entity_id } => {
                write!(f, "unknown identity provider: {entity_id}")
            }
            Self::SessionHandlerMissing { entity_id } => {
                write!(
                    f,
                    "session was issued by identity provider '{entity_id}', which is not configured"
                )
            }
            Self::Invalid { field, reason } => {
                write!(f, "invalid configuration value for '{field}': {reason}")
            }
            Self::Load { details } => write!(f, "failed to load configuration: {details}"),
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Internal faults raised by an identity provider handler.
///
/// These indicate that the service provider itself is broken. They are never
/// folded into "this handler cannot handle the message".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// A protocol message could not be encoded for the redirect binding.
    Encoding { details: String },
    /// The identity provider has no endpoint for the requested operation.
    MissingEndpoint { entity_id: EntityId, endpoint: String },
    /// The response parser failed for reasons unrelated to the message.
    Parser { entity_id: EntityId, details: String },
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoding { details } => {
                write!(f, "failed to encode protocol message: {details}")
            }
            Self::MissingEndpoint {
                entity_id,
                endpoint,
            } => {
                write!(
                    f,
                    "identity provider '{entity_id}' has no {endpoint} endpoint configured"
                )
            }
            Self::Parser { entity_id, details } => {
                write!(
                    f,
                    "response parser for identity provider '{entity_id}' failed: {details}"
                )
            }
        }
    }
}

impl std::error::Error for HandlerError {}

/// Errors from the external per-browser session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    /// The store could not be read or written.
    Unavailable { details: String },
}

impl fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { details } => write!(f, "session store unavailable: {details}"),
        }
    }
}

impl std::error::Error for SessionStoreError {}

/// Errors from the external template renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The named template does not exist.
    TemplateNotFound { template: String },
    /// The template failed to render with the given context.
    Failed { template: String, details: String },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemplateNotFound { template } => write!(f, "template not found: {template}"),
            Self::Failed { template, details } => {
                write!(f, "failed to render '{template}': {details}")
            }
        }
    }
}

impl std::error::Error for RenderError {}

/// Orchestrator-level error context.
///
/// The underlying `ConfigurationError`, `HandlerError` or `SessionStoreError`
/// report is kept as the cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceProviderError {
    /// The request could not be served because of a configuration problem.
    Configuration,
    /// A handler raised an internal fault while processing a message.
    HandlerFault { entity_id: EntityId },
    /// The session store failed.
    SessionStore,
}

impl fmt::Display for ServiceProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "service provider configuration error"),
            Self::HandlerFault { entity_id } => {
                write!(f, "identity provider handler '{entity_id}' failed")
            }
            Self::SessionStore => write!(f, "session store failure"),
        }
    }
}

impl std::error::Error for ServiceProviderError {}
