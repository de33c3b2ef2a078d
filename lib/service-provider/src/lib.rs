//! SAML 2.0 service provider orchestration for samlkit.
//!
//! This crate provides:
//! - The identity provider handler contract (`IdentityProviderHandler`) and a
//!   configured HTTP-Redirect implementation (`RedirectBindingHandler`)
//! - The orchestrator (`ServiceProvider`) for login selection, assertion
//!   consumption, SP- and IdP-initiated logout and metadata
//! - The browser session record (`AuthSession`) and its store (`SessionStore`)
//! - View models for an external template renderer (`View`, `Renderer`)
//!
//! HTTP routing, XML signature verification and template rendering are left to
//! the embedding application, which plugs in through `ResponseParser`,
//! `SessionStore` and `Renderer`.
//!
//! # Login flow
//!
//! Handlers are tried in configured order. The first handler that accepts the
//! response establishes the session; the first handler that denies the user
//! ends the attempt. Only when every handler reports that the response is not
//! addressed to it is the list of reasons returned.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use samlkit_service_provider::{
//!     IdentityProviderConfig, InMemorySessionStore, LoginResult, LoginSelection,
//!     ParseFailure, ParsedLogoutRequest, ParsedResponse, RelayState, ResponseParser,
//!     ServiceProvider, ServiceProviderConfig, SessionStore,
//! };
//!
//! // A parser that trusts every response; real parsers verify signatures.
//! struct TrustingParser;
//!
//! impl ResponseParser for TrustingParser {
//!     fn parse_response(
//!         &self,
//!         idp: &IdentityProviderConfig,
//!         raw_message: &str,
//!     ) -> Result<ParsedResponse, ParseFailure> {
//!         Ok(ParsedResponse::success(idp.entity_id().as_str(), raw_message))
//!     }
//!
//!     fn parse_logout_request(
//!         &self,
//!         _idp: &IdentityProviderConfig,
//!         _raw_message: &str,
//!     ) -> Result<ParsedLogoutRequest, ParseFailure> {
//!         Err(ParseFailure::malformed("not a logout request"))
//!     }
//! }
//!
//! let config = ServiceProviderConfig::builder(
//!     "https://sp.example.com",
//!     "https://sp.example.com/saml/acs",
//! )
//! .identity_provider(IdentityProviderConfig::new(
//!     "https://idp.example.com",
//!     "https://idp.example.com/sso",
//! ))
//! .build();
//! let sp = ServiceProvider::from_config(config, Arc::new(TrustingParser))
//!     .expect("valid configuration");
//! let store = InMemorySessionStore::new();
//!
//! // A single identity provider is used without a chooser.
//! let LoginSelection::Handler(handler) = sp.select_handler_for_login(None).unwrap() else {
//!     unreachable!()
//! };
//! let relay_state = RelayState::from("/dashboard");
//! let redirect = sp.initiate_login(handler.as_ref(), Some(&relay_state)).unwrap();
//! assert!(redirect.as_str().starts_with("https://idp.example.com/sso?SAMLRequest="));
//!
//! let result = sp.consume_assertion("alice", Some(relay_state), &store).unwrap();
//! assert!(matches!(result, LoginResult::LoggedIn { .. }));
//! assert_eq!(store.get().unwrap().unwrap().identity().subject(), "alice");
//! ```

pub mod binding;
pub mod config;
pub mod entity;
pub mod error;
pub mod handler;
pub mod identity;
pub mod metadata;
pub mod orchestrator;
pub mod outcome;
pub mod parser;
pub mod session;
pub mod view;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use config::{
    IdentityProviderConfig, NAME_ID_FORMAT_UNSPECIFIED, ServiceProviderConfig,
    ServiceProviderConfigBuilder,
};
pub use entity::{EntityId, RelayState};
pub use error::{
    ConfigurationError, HandlerError, RenderError, ServiceProviderError, SessionStoreError,
};
pub use handler::{IdentityProviderHandler, RedirectBindingHandler};
pub use identity::{Attributes, Identity};
pub use metadata::MetadataContext;
pub use orchestrator::{LoginSelection, ServiceProvider};
pub use outcome::{
    AssertionOutcome, HandlerRejection, LoginResult, LogoutAck, LogoutInitiation,
    LogoutRequestOutcome, SingleLogoutResult,
};
pub use parser::{ParseFailure, ParsedLogoutRequest, ParsedResponse, ResponseParser, STATUS_SUCCESS};
pub use session::{AuthSession, InMemorySessionStore, SessionStore};
pub use view::{IdpChoice, Presentation, Renderer, View};
