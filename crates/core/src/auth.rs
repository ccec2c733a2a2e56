use serde::{Deserialize, Serialize};

use crate::UserId;

/// Authenticated actor supplied by the calling gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    user_id: UserId,
    ip_address: Option<String>,
}

impl ActorIdentity {
    /// Creates an actor identity for a user, optionally carrying the client address.
    #[must_use]
    pub fn new(user_id: UserId, ip_address: Option<String>) -> Self {
        Self {
            user_id,
            ip_address,
        }
    }

    /// Returns the stable user identifier of the actor.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the client address recorded for audit, when known.
    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }
}
