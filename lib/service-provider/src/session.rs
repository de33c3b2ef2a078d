//! Per-browser authentication state.
//!
//! An `AuthSession` records who is logged in and which identity provider
//! vouched for them. The unauthenticated state is the *absence* of a session
//! (`Option<AuthSession>` is `None`), so an identity can never exist without
//! its issuing entity ID or vice versa.
//!
//! Storage is external. The orchestrator talks to it through [`SessionStore`],
//! always writing or clearing the whole record in one call.

use chrono::{DateTime, Utc};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::entity::EntityId;
use crate::error::SessionStoreError;
use crate::identity::Identity;

/// The authenticated identity of one browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// The authenticated principal.
    identity: Identity,
    /// Entity ID of the identity provider that issued the assertion.
    issuing_entity_id: EntityId,
    /// SAML `SessionIndex`, used to correlate logout requests.
    session_index: Option<String>,
    /// When the assertion was consumed.
    authenticated_at: DateTime<Utc>,
}

impl AuthSession {
    /// Creates a session for an identity accepted by the given identity provider.
    #[must_use]
    pub fn new(
        identity: Identity,
        issuing_entity_id: EntityId,
        session_index: Option<String>,
    ) -> Self {
        Self {
            identity,
            issuing_entity_id,
            session_index,
            authenticated_at: Utc::now(),
        }
    }

    /// Returns the authenticated principal.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the entity ID of the identity provider that authenticated the user.
    #[must_use]
    pub fn issuing_entity_id(&self) -> &EntityId {
        &self.issuing_entity_id
    }

    /// Returns the SAML session index, if the assertion carried one.
    #[must_use]
    pub fn session_index(&self) -> Option<&str> {
        self.session_index.as_deref()
    }

    /// Returns when the session was established.
    #[must_use]
    pub fn authenticated_at(&self) -> DateTime<Utc> {
        self.authenticated_at
    }
}

/// Storage for the current browser session's `AuthSession`.
///
/// Implementations are scoped to one browser session and must be usable
/// synchronously within a request. `set` replaces the whole record and
/// `clear` removes it; neither may leave a partially written session behind.
pub trait SessionStore {
    /// Returns the current session, if the browser is authenticated.
    fn get(&self) -> Result<Option<AuthSession>, Report<SessionStoreError>>;

    /// Replaces the current session.
    fn set(&self, session: AuthSession) -> Result<(), Report<SessionStoreError>>;

    /// Removes the current session. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), Report<SessionStoreError>>;
}

/// A `SessionStore` holding a single session in memory.
///
/// Useful for embedding the orchestrator in a process that already resolves
/// the browser session (one store per browser session) and for tests.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    slot: Mutex<Option<AuthSession>>,
}

impl InMemorySessionStore {
    /// Creates an empty (unauthenticated) store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a session.
    #[must_use]
    pub fn with_session(session: AuthSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<AuthSession>>, Report<SessionStoreError>> {
        self.slot.lock().map_err(|_| {
            SessionStoreError::Unavailable {
                details: "session lock poisoned".to_string(),
            }
            .into()
        })
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self) -> Result<Option<AuthSession>, Report<SessionStoreError>> {
        Ok(self.lock()?.clone())
    }

    fn set(&self, session: AuthSession) -> Result<(), Report<SessionStoreError>> {
        *self.lock()? = Some(session);
        Ok(())
    }

    fn clear(&self) -> Result<(), Report<SessionStoreError>> {
        *self.lock()? = None;
        Ok(())
    }
}
