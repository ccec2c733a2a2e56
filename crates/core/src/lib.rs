//! Shared primitives for all Rust crates in Lendgate.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use auth::ActorIdentity;

/// Result type used across Lendgate crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Stable identifier of a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UserId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid user id '{value}': {error}")))
    }
}

/// Common application error categories.
///
/// Every variant is a typed outcome that callers map to a stable transport
/// status; nothing in the core panics or retries on these.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state or lost a concurrent race.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller did not present a trusted actor identity.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Actor lacks the permission required for the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Requested workflow transition is not in the transition table.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Required transition payload field is absent or blank.
    #[error("missing payload field '{0}'")]
    MissingPayload(String),

    /// Account identifier is already used by another active application.
    #[error("duplicate account identifier '{0}'")]
    DuplicateAccountIdentifier(String),

    /// System roles cannot be changed through the mutation API.
    #[error("system role '{0}' is protected")]
    SystemRoleProtected(String),

    /// Parent assignment would introduce a cycle in the role hierarchy.
    #[error("cyclic role hierarchy: {0}")]
    CyclicHierarchy(String),

    /// Template is inactive or otherwise unusable.
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns a stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::MissingPayload(_) => "missing_payload",
            Self::DuplicateAccountIdentifier(_) => "duplicate_account_identifier",
            Self::SystemRoleProtected(_) => "system_role_protected",
            Self::CyclicHierarchy(_) => "cyclic_hierarchy",
            Self::InvalidTemplate(_) => "invalid_template",
            Self::Internal(_) => "internal",
        }
    }
}
