//! Scripted collaborators for unit tests.

use rootcause::prelude::Report;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use crate::config::IdentityProviderConfig;
use crate::entity::{EntityId, RelayState};
use crate::error::{HandlerError, SessionStoreError};
use crate::handler::IdentityProviderHandler;
use crate::identity::Identity;
use crate::outcome::{AssertionOutcome, LogoutRequestOutcome};
use crate::parser::{ParseFailure, ParsedLogoutRequest, ParsedResponse, ResponseParser};
use crate::session::{AuthSession, InMemorySessionStore, SessionStore};

/// A handler that returns scripted outcomes and counts how often it was tried.
#[derive(Debug)]
pub(crate) struct StubHandler {
    entity_id: EntityId,
    is_default: bool,
    has_slo: bool,
    outcome: Result<AssertionOutcome, HandlerError>,
    logout_outcome: Result<LogoutRequestOutcome, HandlerError>,
    consume_calls: AtomicUsize,
    logout_request_calls: AtomicUsize,
}

impl StubHandler {
    /// A handler for which every message is `NotApplicable`.
    pub(crate) fn new(entity_id: &str) -> Self {
        Self {
            entity_id: EntityId::from(entity_id),
            is_default: false,
            has_slo: true,
            outcome: Ok(AssertionOutcome::not_applicable(format!(
                "not addressed to {entity_id}"
            ))),
            logout_outcome: Ok(LogoutRequestOutcome::NotApplicable {
                reason: format!("not issued by {entity_id}"),
            }),
            consume_calls: AtomicUsize::new(0),
            logout_request_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn accepting(entity_id: &str, subject: &str) -> Self {
        Self::new(entity_id).with_outcome(Ok(AssertionOutcome::Accepted {
            identity: Identity::new(subject),
            session_index: Some(format!("_{subject}_session")),
        }))
    }

    pub(crate) fn denying(entity_id: &str, reason: &str) -> Self {
        Self::new(entity_id).with_outcome(Ok(AssertionOutcome::denied(reason)))
    }

    pub(crate) fn failing(entity_id: &str, details: &str) -> Self {
        let error = HandlerError::Parser {
            entity_id: EntityId::from(entity_id),
            details: details.to_string(),
        };
        Self::new(entity_id).with_outcome(Err(error))
    }

    pub(crate) fn with_outcome(mut self, outcome: Result<AssertionOutcome, HandlerError>) -> Self {
        self.outcome = outcome;
        self
    }

    pub(crate) fn recognizing_logout(mut self, request_id: &str) -> Self {
        self.logout_outcome = Ok(LogoutRequestOutcome::Recognized {
            request_id: Some(request_id.to_string()),
            session_index: None,
        });
        self
    }

    pub(crate) fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub(crate) fn without_slo(mut self) -> Self {
        self.has_slo = false;
        self
    }

    pub(crate) fn consume_calls(&self) -> usize {
        self.consume_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn logout_request_calls(&self) -> usize {
        self.logout_request_calls.load(Ordering::SeqCst)
    }

    fn endpoint(&self, path: &str, relay_state: Option<&RelayState>) -> Url {
        let mut url = Url::parse(&format!("https://{}.test/{path}", self.entity_id))
            .expect("stub entity ids are valid hosts");
        if let Some(relay_state) = relay_state {
            url.query_pairs_mut()
                .append_pair("RelayState", relay_state.as_str());
        }
        url
    }
}

impl IdentityProviderHandler for StubHandler {
    fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    fn is_default(&self) -> bool {
        self.is_default
    }

    fn build_login_request_url(
        &self,
        relay_state: Option<&RelayState>,
    ) -> Result<Url, Report<HandlerError>> {
        Ok(self.endpoint("sso", relay_state))
    }

    fn build_logout_request_url(
        &self,
        session: &AuthSession,
        relay_state: Option<&RelayState>,
    ) -> Result<Url, Report<HandlerError>> {
        assert_eq!(session.issuing_entity_id(), &self.entity_id);
        if !self.has_slo {
            return Err(HandlerError::MissingEndpoint {
                entity_id: self.entity_id.clone(),
                endpoint: "single logout".to_string(),
            }
            .into());
        }
        Ok(self.endpoint("slo", relay_state))
    }

    fn try_consume(&self, _raw_message: &str) -> Result<AssertionOutcome, Report<HandlerError>> {
        self.consume_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(Into::into)
    }

    fn try_consume_logout_request(
        &self,
        _raw_message: &str,
    ) -> Result<LogoutRequestOutcome, Report<HandlerError>> {
        self.logout_request_calls.fetch_add(1, Ordering::SeqCst);
        self.logout_outcome.clone().map_err(Into::into)
    }
}

/// A parser returning scripted results regardless of input.
#[derive(Debug, Default)]
pub(crate) struct StubParser {
    response: Option<Result<ParsedResponse, ParseFailure>>,
    logout_request: Option<Result<ParsedLogoutRequest, ParseFailure>>,
}

impl StubParser {
    pub(crate) fn responding(response: Result<ParsedResponse, ParseFailure>) -> Self {
        Self {
            response: Some(response),
            logout_request: None,
        }
    }

    pub(crate) fn with_logout_request(
        mut self,
        request: Result<ParsedLogoutRequest, ParseFailure>,
    ) -> Self {
        self.logout_request = Some(request);
        self
    }
}

impl ResponseParser for StubParser {
    fn parse_response(
        &self,
        _idp: &IdentityProviderConfig,
        _raw_message: &str,
    ) -> Result<ParsedResponse, ParseFailure> {
        self.response
            .clone()
            .unwrap_or_else(|| Err(ParseFailure::malformed("no response scripted")))
    }

    fn parse_logout_request(
        &self,
        _idp: &IdentityProviderConfig,
        _raw_message: &str,
    ) -> Result<ParsedLogoutRequest, ParseFailure> {
        self.logout_request
            .clone()
            .unwrap_or_else(|| Err(ParseFailure::malformed("no logout request scripted")))
    }
}

/// Which `SessionStore` operation a [`FailingSessionStore`] rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreFault {
    Set,
    Clear,
}

/// A session store that fails one operation and otherwise behaves like
/// [`InMemorySessionStore`].
#[derive(Debug)]
pub(crate) struct FailingSessionStore {
    inner: InMemorySessionStore,
    fault: StoreFault,
}

impl FailingSessionStore {
    pub(crate) fn new(fault: StoreFault) -> Self {
        Self {
            inner: InMemorySessionStore::new(),
            fault,
        }
    }

    pub(crate) fn with_session(fault: StoreFault, session: AuthSession) -> Self {
        Self {
            inner: InMemorySessionStore::with_session(session),
            fault,
        }
    }

    fn check(&self, operation: StoreFault) -> Result<(), Report<SessionStoreError>> {
        if self.fault == operation {
            return Err(SessionStoreError::Unavailable {
                details: format!("{operation:?} rejected"),
            }
            .into());
        }
        Ok(())
    }
}

impl SessionStore for FailingSessionStore {
    fn get(&self) -> Result<Option<AuthSession>, Report<SessionStoreError>> {
        self.inner.get()
    }

    fn set(&self, session: AuthSession) -> Result<(), Report<SessionStoreError>> {
        self.check(StoreFault::Set)?;
        self.inner.set(session)
    }

    fn clear(&self) -> Result<(), Report<SessionStoreError>> {
        self.check(StoreFault::Clear)?;
        self.inner.clear()
    }
}
