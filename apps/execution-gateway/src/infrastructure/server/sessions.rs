//! Client sessions keyed by the client id presented in `Connect`.

use std::collections::HashMap;

use crate::domain::shared::{ClientId, SessionId};

/// Outcome of a `Connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOpen {
    /// A new session was minted.
    Opened(SessionId),
    /// The client already had this session.
    Existing(SessionId),
}

impl SessionOpen {
    /// The client's session.
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        match self {
            Self::Opened(id) | Self::Existing(id) => id,
        }
    }
}

/// Open sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ClientId, SessionId>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session, or return the one the client already has.
    pub fn connect(&mut self, client_id: &ClientId) -> SessionOpen {
        if let Some(existing) = self.sessions.get(client_id) {
            return SessionOpen::Existing(existing.clone());
        }
        let session_id = SessionId::generate();
        self.sessions.insert(client_id.clone(), session_id.clone());
        SessionOpen::Opened(session_id)
    }

    /// Close the client's session, if any.
    pub fn disconnect(&mut self, client_id: &ClientId) -> Option<SessionId> {
        self.sessions.remove(client_id)
    }

    /// Get the client's session.
    #[must_use]
    pub fn session(&self, client_id: &ClientId) -> Option<&SessionId> {
        self.sessions.get(client_id)
    }

    /// Iterate open sessions.
    pub fn iter(&self) -> impl Iterator<Item = (&ClientId, &SessionId)> {
        self.sessions.iter()
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no session is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
