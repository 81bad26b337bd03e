//! Session identity resolution.
//!
//! A session is addressed by an opaque `(user_id, agent_id)` pair. The push
//! channel additionally needs a connection token, generated once per resolver
//! and reused for every reconnect so the gateway can correlate attempts.

use uuid::Uuid;

use crate::{env::Environment, error::IdentityError};

/// Validated identity of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    user_id: String,
    agent_id: String,
    connection_token: Uuid,
}

impl SessionIdentity {
    /// Trimmed user identifier.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Trimmed agent identifier.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Token sent as `webSocketId` when opening the push channel.
    pub fn connection_token(&self) -> Uuid {
        self.connection_token
    }

    /// Identity the backend reports once the session is ready.
    pub fn session_key(&self) -> String {
        format!("{}_{}", self.user_id, self.agent_id)
    }
}

/// Validates identifiers and owns the process-wide connection token.
#[derive(Debug, Clone)]
pub struct IdentityResolver<E: Environment> {
    env: E,
    token: Option<Uuid>,
}

impl<E: Environment> IdentityResolver<E> {
    /// Create a resolver. No token is generated until the first resolution.
    pub fn new(env: E) -> Self {
        Self { env, token: None }
    }

    /// Resolve a session identity.
    ///
    /// # Errors
    ///
    /// - `IdentityError::EmptyUserId` if `user_id` is empty or whitespace
    /// - `IdentityError::EmptyAgentId` if `agent_id` is empty or whitespace
    pub fn resolve(
        &mut self,
        user_id: &str,
        agent_id: &str,
    ) -> Result<SessionIdentity, IdentityError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(IdentityError::EmptyUserId);
        }

        let agent_id = agent_id.trim();
        if agent_id.is_empty() {
            return Err(IdentityError::EmptyAgentId);
        }

        Ok(SessionIdentity {
            user_id: user_id.to_owned(),
            agent_id: agent_id.to_owned(),
            connection_token: self.connection_token(),
        })
    }

    /// Connection token, generating it on first use.
    pub fn connection_token(&mut self) -> Uuid {
        *self.token.get_or_insert_with(|| self.env.random_uuid())
    }
}
