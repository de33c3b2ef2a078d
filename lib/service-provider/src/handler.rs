//! Identity provider handlers.
//!
//! A handler represents one configured identity provider. It builds the
//! redirect URLs that start login and logout at that provider and classifies
//! inbound messages into an [`AssertionOutcome`]:
//!
//! - `NotApplicable`: the message is not from this provider or cannot be read
//!   as one of its messages. The orchestrator moves on to the next handler.
//! - `Denied`: the message is this provider's and is valid, but the user may
//!   not log in. The orchestrator stops.
//! - `Accepted`: the user is authenticated and authorized.
//!
//! Internal faults (the parser could not run at all) are errors, never
//! `NotApplicable`.

use chrono::Utc;
use rootcause::prelude::Report;
use samlkit_core::{AuthnRequestId, LogoutRequestId};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::binding::{AuthnRequest, LogoutRequest, deflate_and_encode, redirect_url};
use crate::config::{IdentityProviderConfig, ServiceProviderConfig, parse_endpoint};
use crate::entity::{EntityId, RelayState};
use crate::error::{ConfigurationError, HandlerError};
use crate::identity::Identity;
use crate::outcome::{AssertionOutcome, LogoutRequestOutcome};
use crate::parser::{ParseFailure, ParsedResponse, ResponseParser};
use crate::session::AuthSession;

/// Contract for one configured identity provider.
///
/// Handlers are built at startup, immutable afterwards and shared read-only
/// across requests.
pub trait IdentityProviderHandler: Send + Sync + fmt::Debug {
    /// Returns the identity provider's entity ID.
    fn entity_id(&self) -> &EntityId;

    /// Returns a human-readable name for the chooser page.
    fn display_name(&self) -> &str {
        self.entity_id().as_str()
    }

    /// Returns true if this handler should be used without offering a choice.
    fn is_default(&self) -> bool {
        false
    }

    /// Builds the redirect that starts login at this identity provider.
    ///
    /// # Errors
    ///
    /// Returns an error only for internal encoding faults.
    fn build_login_request_url(
        &self,
        relay_state: Option<&RelayState>,
    ) -> Result<Url, Report<HandlerError>>;

    /// Builds the redirect that logs `session` out at this identity provider.
    ///
    /// # Panics
    ///
    /// Panics if `session` was not issued by this identity provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider has no logout endpoint or encoding fails.
    fn build_logout_request_url(
        &self,
        session: &AuthSession,
        relay_state: Option<&RelayState>,
    ) -> Result<Url, Report<HandlerError>>;

    /// Attempts to consume an inbound `SAMLResponse`.
    ///
    /// # Errors
    ///
    /// Returns an error only for internal faults; a message that does not
    /// belong to this identity provider is `NotApplicable`.
    fn try_consume(&self, raw_message: &str) -> Result<AssertionOutcome, Report<HandlerError>>;

    /// Attempts to interpret an inbound IdP-initiated `LogoutRequest`.
    ///
    /// # Errors
    ///
    /// As for [`try_consume`](Self::try_consume).
    fn try_consume_logout_request(
        &self,
        raw_message: &str,
    ) -> Result<LogoutRequestOutcome, Report<HandlerError>>;
}

/// Service provider values every handler needs to address its requests.
#[derive(Debug, Clone)]
struct ServiceProviderContext {
    entity_id: EntityId,
    acs_url: String,
    name_id_format: String,
}

/// Handler for an identity provider reached through the HTTP-Redirect binding.
///
/// Message decoding and signature verification are delegated to a
/// [`ResponseParser`]; this type owns the classification rules.
pub struct RedirectBindingHandler {
    idp: IdentityProviderConfig,
    sso_url: Url,
    slo_url: Option<Url>,
    sp: ServiceProviderContext,
    parser: Arc<dyn ResponseParser>,
}

impl fmt::Debug for RedirectBindingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectBindingHandler")
            .field("entity_id", self.idp.entity_id())
            .field("sso_url", &self.sso_url.as_str())
            .field("slo_url", &self.slo_url.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}

impl RedirectBindingHandler {
    /// Creates a handler for one identity provider of a service provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity provider endpoints are not absolute
    /// `http(s)` URLs.
    pub fn new(
        idp: IdentityProviderConfig,
        sp: &ServiceProviderConfig,
        parser: Arc<dyn ResponseParser>,
    ) -> Result<Self, Report<ConfigurationError>> {
        idp.validate()?;
        let sso_url = parse_endpoint("identity_providers.sso_url", idp.sso_url())?;
        let slo_url = idp
            .slo_url()
            .map(|url| parse_endpoint("identity_providers.slo_url", url))
            .transpose()?;

        Ok(Self {
            idp,
            sso_url,
            slo_url,
            sp: ServiceProviderContext {
                entity_id: sp.entity_id().clone(),
                acs_url: sp.acs_url().to_string(),
                name_id_format: sp.name_id_format().to_string(),
            },
            parser,
        })
    }

    /// Returns the identity provider configuration.
    #[must_use]
    pub fn config(&self) -> &IdentityProviderConfig {
        &self.idp
    }

    /// Maps a parser failure to either `NotApplicable` or an internal fault.
    fn classify_failure(&self, failure: ParseFailure) -> Result<String, Report<HandlerError>> {
        match failure {
            ParseFailure::Malformed { reason } => Ok(reason),
            ParseFailure::Internal { details } => Err(HandlerError::Parser {
                entity_id: self.idp.entity_id().clone(),
                details,
            }
            .into()),
        }
    }

    /// Returns a mismatch reason if `issuer` is not this identity provider.
    fn issuer_mismatch(&self, issuer: Option<&str>) -> Option<String> {
        let expected = self.idp.entity_id().as_str();
        match issuer {
            Some(issuer) if issuer == expected => None,
            Some(issuer) => Some(format!("issuer '{issuer}' is not '{expected}'")),
            None => Some("message has no issuer".to_string()),
        }
    }

    /// Applies status and authorization rules to a verified response.
    fn classify_response(&self, parsed: ParsedResponse) -> AssertionOutcome {
        if let Some(reason) = self.issuer_mismatch(parsed.issuer.as_deref()) {
            return AssertionOutcome::not_applicable(reason);
        }

        if !parsed.is_success() {
            let reason = match &parsed.status_message {
                Some(message) => format!("status {}: {message}", parsed.status_code),
                None => format!("status {}", parsed.status_code),
            };
            return AssertionOutcome::denied(reason);
        }

        let Some(subject) = parsed.name_id.filter(|s| !s.is_empty()) else {
            return AssertionOutcome::not_applicable("assertion has no subject NameID");
        };

        let missing: Vec<&str> = self
            .idp
            .required_attributes()
            .iter()
            .filter(|name| {
                parsed
                    .attributes
                    .get(name.as_str())
                    .is_none_or(|values| values.iter().all(String::is_empty))
            })
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return AssertionOutcome::denied(format!(
                "missing required attributes: {}",
                missing.join(", ")
            ));
        }

        AssertionOutcome::Accepted {
            identity: Identity::new(subject)
                .with_name_id_format(parsed.name_id_format)
                .with_attributes(parsed.attributes),
            session_index: parsed.session_index,
        }
    }
}

impl IdentityProviderHandler for RedirectBindingHandler {
    fn entity_id(&self) -> &EntityId {
        self.idp.entity_id()
    }

    fn display_name(&self) -> &str {
        self.idp.display_name()
    }

    fn is_default(&self) -> bool {
        self.idp.is_default()
    }

    fn build_login_request_url(
        &self,
        relay_state: Option<&RelayState>,
    ) -> Result<Url, Report<HandlerError>> {
        let request = AuthnRequest {
            id: AuthnRequestId::new(),
            issue_instant: Utc::now(),
            destination: self.sso_url.as_str(),
            acs_url: &self.sp.acs_url,
            issuer: self.sp.entity_id.as_str(),
            name_id_format: &self.sp.name_id_format,
        };
        let encoded = deflate_and_encode(&request.to_xml())?;

        debug!(idp = %self.idp.entity_id(), request_id = %request.id, "built AuthnRequest redirect");
        Ok(redirect_url(&self.sso_url, &encoded, relay_state))
    }

    fn build_logout_request_url(
        &self,
        session: &AuthSession,
        relay_state: Option<&RelayState>,
    ) -> Result<Url, Report<HandlerError>> {
        assert_eq!(
            session.issuing_entity_id(),
            self.idp.entity_id(),
            "logout requested from an identity provider that did not issue the session"
        );

        let slo_url = self
            .slo_url
            .as_ref()
            .ok_or_else(|| HandlerError::MissingEndpoint {
                entity_id: self.idp.entity_id().clone(),
                endpoint: "single logout".to_string(),
            })?;

        let identity = session.identity();
        let request = LogoutRequest {
            id: LogoutRequestId::new(),
            issue_instant: Utc::now(),
            destination: slo_url.as_str(),
            issuer: self.sp.entity_id.as_str(),
            name_id: identity.subject(),
            name_id_format: identity.name_id_format(),
            session_index: session.session_index(),
        };
        let encoded = deflate_and_encode(&request.to_xml())?;

        debug!(idp = %self.idp.entity_id(), request_id = %request.id, "built LogoutRequest redirect");
        Ok(redirect_url(slo_url, &encoded, relay_state))
    }

    fn try_consume(&self, raw_message: &str) -> Result<AssertionOutcome, Report<HandlerError>> {
        let parsed = match self.parser.parse_response(&self.idp, raw_message) {
            Ok(parsed) => parsed,
            Err(failure) => {
                let reason = self.classify_failure(failure)?;
                return Ok(AssertionOutcome::not_applicable(reason));
            }
        };
        Ok(self.classify_response(parsed))
    }

    fn try_consume_logout_request(
        &self,
        raw_message: &str,
    ) -> Result<LogoutRequestOutcome, Report<HandlerError>> {
        let parsed = match self.parser.parse_logout_request(&self.idp, raw_message) {
            Ok(parsed) => parsed,
            Err(failure) => {
                let reason = self.classify_failure(failure)?;
                return Ok(LogoutRequestOutcome::NotApplicable { reason });
            }
        };

        if let Some(reason) = self.issuer_mismatch(parsed.issuer.as_deref()) {
            return Ok(LogoutRequestOutcome::NotApplicable { reason });
        }

        Ok(LogoutRequestOutcome::Recognized {
            request_id: parsed.id,
            session_index: parsed.session_index,
        })
    }
}
