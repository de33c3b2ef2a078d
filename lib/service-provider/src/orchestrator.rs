//! The service provider orchestrator.
//!
//! [`ServiceProvider`] owns the configured identity provider handlers and
//! drives the login and logout flows against them. It holds no per-request
//! state: the browser session is passed in through a [`SessionStore`] on every
//! call, so one orchestrator can be shared across concurrent requests.
//!
//! # Session lifecycle
//!
//! ```text
//! Unauthenticated --consume_assertion (Accepted)--> Authenticated
//! Authenticated --consume_assertion (Accepted)--> Authenticated (replaced)
//! Authenticated --initiate_logout / handle_single_logout--> Unauthenticated
//! ```

use rootcause::prelude::{Report, ResultExt};
use samlkit_core::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::ServiceProviderConfig;
use crate::entity::{EntityId, RelayState};
use crate::error::{ConfigurationError, ServiceProviderError};
use crate::handler::{IdentityProviderHandler, RedirectBindingHandler};
use crate::metadata::MetadataContext;
use crate::outcome::{
    AssertionOutcome, HandlerRejection, LoginResult, LogoutAck, LogoutInitiation,
    LogoutRequestOutcome, SingleLogoutResult,
};
use crate::parser::ResponseParser;
use crate::session::{AuthSession, SessionStore};

/// Result of choosing an identity provider for a new login.
#[derive(Debug, Clone)]
pub enum LoginSelection {
    /// Log in with this handler without asking the user.
    Handler(Arc<dyn IdentityProviderHandler>),
    /// The user must choose; every configured handler, in configured order.
    NeedsChoice(Vec<Arc<dyn IdentityProviderHandler>>),
}

/// Orchestrates SAML login and logout across the configured identity providers.
#[derive(Debug)]
pub struct ServiceProvider {
    config: ServiceProviderConfig,
    handlers: Vec<Arc<dyn IdentityProviderHandler>>,
}

impl ServiceProvider {
    /// Creates an orchestrator from explicit handlers.
    ///
    /// Handlers are tried in the order given. The identity providers listed in
    /// `config` are not used to build handlers here; see
    /// [`from_config`](Self::from_config).
    ///
    /// # Errors
    ///
    /// Returns an error if the service provider fields are invalid, no handler
    /// is given, two handlers share an entity ID, or more than one handler is
    /// marked as the default.
    pub fn new(
        config: ServiceProviderConfig,
        handlers: Vec<Arc<dyn IdentityProviderHandler>>,
    ) -> Result<Self, ConfigurationError> {
        config.validate_service_provider()?;
        validate_handlers(&handlers)?;

        debug!(
            entity_id = %config.entity_id(),
            handlers = handlers.len(),
            "service provider configured"
        );
        Ok(Self { config, handlers })
    }

    /// Creates an orchestrator with a [`RedirectBindingHandler`] for every
    /// configured identity provider, all sharing `parser`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn from_config(
        config: ServiceProviderConfig,
        parser: Arc<dyn ResponseParser>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let handlers = config
            .identity_providers()
            .iter()
            .cloned()
            .map(|idp| {
                RedirectBindingHandler::new(idp, &config, Arc::clone(&parser))
                    .map(|handler| Arc::new(handler) as Arc<dyn IdentityProviderHandler>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(config, handlers)
    }

    /// Returns the service provider configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceProviderConfig {
        &self.config
    }

    /// Returns every handler, in configured order.
    #[must_use]
    pub fn handlers(&self) -> &[Arc<dyn IdentityProviderHandler>] {
        &self.handlers
    }

    /// Returns the handler for an identity provider.
    #[must_use]
    pub fn handler(&self, entity_id: &EntityId) -> Option<Arc<dyn IdentityProviderHandler>> {
        self.handlers
            .iter()
            .find(|handler| handler.entity_id() == entity_id)
            .cloned()
    }

    /// Returns the handler marked as the default, if any.
    #[must_use]
    pub fn default_handler(&self) -> Option<Arc<dyn IdentityProviderHandler>> {
        self.handlers
            .iter()
            .find(|handler| handler.is_default())
            .cloned()
    }

    /// Chooses the identity provider for a new login.
    ///
    /// An explicitly requested entity ID wins. Otherwise a lone handler, or
    /// the default handler, is used directly; with several handlers and no
    /// default the caller must ask the user.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentityProvider` if `entity_id` is not configured.
    pub fn select_handler_for_login(
        &self,
        entity_id: Option<&EntityId>,
    ) -> Result<LoginSelection, ConfigurationError> {
        if let Some(entity_id) = entity_id {
            return self
                .handler(entity_id)
                .map(LoginSelection::Handler)
                .ok_or_else(|| {
                    ConfigurationError::UnknownIdentityProvider {
                        entity_id: entity_id.clone(),
                    }
                    .into()
                });
        }

        if let [only] = self.handlers.as_slice() {
            return Ok(LoginSelection::Handler(Arc::clone(only)));
        }

        Ok(match self.default_handler() {
            Some(handler) => LoginSelection::Handler(handler),
            None => LoginSelection::NeedsChoice(self.handlers.clone()),
        })
    }

    /// Builds the redirect that starts login at `handler`.
    ///
    /// The session is not touched; login completes in
    /// [`consume_assertion`](Self::consume_assertion).
    ///
    /// # Errors
    ///
    /// Returns an error if the handler fails to encode the request.
    #[instrument(skip(self, handler), fields(idp = %handler.entity_id()))]
    pub fn initiate_login(
        &self,
        handler: &dyn IdentityProviderHandler,
        relay_state: Option<&RelayState>,
    ) -> Result<Url, ServiceProviderError> {
        handler
            .build_login_request_url(relay_state)
            .context(ServiceProviderError::HandlerFault {
                entity_id: handler.entity_id().clone(),
            })
    }

    /// Consumes an inbound `SAMLResponse`.
    ///
    /// Handlers are tried one at a time in configured order. The first
    /// `Accepted` outcome establishes a fresh session and the first `Denied`
    /// outcome ends the attempt; in both cases later handlers are not tried.
    /// If every handler reports `NotApplicable`, all their reasons are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler raises an internal fault or the session
    /// store fails. Neither case writes the session.
    #[instrument(skip(self, raw_message, store))]
    pub fn consume_assertion<S: SessionStore + ?Sized>(
        &self,
        raw_message: &str,
        relay_state: Option<RelayState>,
        store: &S,
    ) -> Result<LoginResult, ServiceProviderError> {
        let mut errors = Vec::new();

        for handler in &self.handlers {
            let entity_id = handler.entity_id();
            let outcome = handler.try_consume(raw_message).context(
                ServiceProviderError::HandlerFault {
                    entity_id: entity_id.clone(),
                },
            )?;

            match outcome {
                AssertionOutcome::Accepted {
                    identity,
                    session_index,
                } => {
                    let session =
                        AuthSession::new(identity.clone(), entity_id.clone(), session_index);
                    store
                        .set(session)
                        .context(ServiceProviderError::SessionStore)?;

                    info!(idp = %entity_id, subject = identity.subject(), "session established");
                    return Ok(LoginResult::LoggedIn {
                        identity,
                        relay_state,
                    });
                }
                AssertionOutcome::Denied { reason } => {
                    info!(idp = %entity_id, %reason, "user denied");
                    return Ok(LoginResult::Unauthorized {
                        entity_id: entity_id.clone(),
                        reason,
                        relay_state,
                    });
                }
                AssertionOutcome::NotApplicable { reason } => {
                    debug!(idp = %entity_id, %reason, "handler not applicable");
                    errors.push(HandlerRejection::new(entity_id.clone(), reason));
                }
            }
        }

        debug!(rejections = errors.len(), "no handler accepted the response");
        Ok(LoginResult::NoHandlerApplicable { errors })
    }

    /// Starts an SP-initiated logout.
    ///
    /// The local session is cleared before the redirect is returned, whether
    /// or not the browser follows it.
    ///
    /// # Errors
    ///
    /// Returns `SessionHandlerMissing` context if the session was issued by an
    /// identity provider that is no longer configured; the session is left in
    /// place in that case. Returns an error if the session store fails or the
    /// logout request cannot be built; the session is cleared in the latter
    /// case.
    #[instrument(skip(self, store))]
    pub fn initiate_logout<S: SessionStore + ?Sized>(
        &self,
        relay_state: Option<&RelayState>,
        store: &S,
    ) -> Result<LogoutInitiation, ServiceProviderError> {
        let Some(session) = store.get().context(ServiceProviderError::SessionStore)? else {
            debug!("logout requested without a session");
            return Ok(LogoutInitiation::NotLoggedIn);
        };

        let entity_id = session.issuing_entity_id();
        let Some(handler) = self.handler(entity_id) else {
            return Err(Report::<ConfigurationError>::from(
                ConfigurationError::SessionHandlerMissing {
                    entity_id: entity_id.clone(),
                },
            )
            .context(ServiceProviderError::Configuration));
        };

        let redirect = handler.build_logout_request_url(&session, relay_state);
        store.clear().context(ServiceProviderError::SessionStore)?;
        info!(idp = %entity_id, subject = session.identity().subject(), "session cleared");

        let url = redirect.context(ServiceProviderError::HandlerFault {
            entity_id: entity_id.clone(),
        })?;
        Ok(LogoutInitiation::Redirect(url))
    }

    /// Handles an IdP-initiated `LogoutRequest`.
    ///
    /// The first handler that recognises the request clears the local session,
    /// whether or not one exists. An unrecognised request leaves the session
    /// untouched and reports every handler's reason.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler raises an internal fault or the session
    /// store fails.
    #[instrument(skip(self, raw_message, store))]
    pub fn handle_single_logout<S: SessionStore + ?Sized>(
        &self,
        raw_message: &str,
        relay_state: Option<RelayState>,
        store: &S,
    ) -> Result<SingleLogoutResult, ServiceProviderError> {
        let mut errors = Vec::new();

        for handler in &self.handlers {
            let entity_id = handler.entity_id();
            let outcome = handler.try_consume_logout_request(raw_message).context(
                ServiceProviderError::HandlerFault {
                    entity_id: entity_id.clone(),
                },
            )?;

            match outcome {
                LogoutRequestOutcome::Recognized { request_id, .. } => {
                    store.clear().context(ServiceProviderError::SessionStore)?;
                    info!(idp = %entity_id, "session cleared by identity provider");
                    return Ok(SingleLogoutResult::Acknowledged(LogoutAck {
                        entity_id: entity_id.clone(),
                        in_response_to: request_id,
                        relay_state,
                    }));
                }
                LogoutRequestOutcome::NotApplicable { reason } => {
                    debug!(idp = %entity_id, %reason, "logout request not applicable");
                    errors.push(HandlerRejection::new(entity_id.clone(), reason));
                }
            }
        }

        Ok(SingleLogoutResult::Unrecognized { errors })
    }

    /// Returns the values needed to render this service provider's metadata.
    #[must_use]
    pub fn describe_metadata(&self) -> MetadataContext {
        let mut context = MetadataContext::from(&self.config);
        context.identity_providers = self
            .handlers
            .iter()
            .map(|handler| handler.entity_id().clone())
            .collect();
        context
    }
}

fn validate_handlers(
    handlers: &[Arc<dyn IdentityProviderHandler>],
) -> Result<(), ConfigurationError> {
    if handlers.is_empty() {
        return Err(ConfigurationError::NoIdentityProviders.into());
    }

    let mut seen = HashSet::new();
    for handler in handlers {
        if !seen.insert(handler.entity_id()) {
            return Err(ConfigurationError::DuplicateEntityId {
                entity_id: handler.entity_id().clone(),
            }
            .into());
        }
    }

    let defaults: Vec<EntityId> = handlers
        .iter()
        .filter(|handler| handler.is_default())
        .map(|handler| handler.entity_id().clone())
        .collect();
    if defaults.len() > 1 {
        return Err(ConfigurationError::MultipleDefaults {
            entity_ids: defaults,
        }
        .into());
    }

    Ok(())
}
