//! Permission triples, catalog entries and well-known resource and action names.

use std::fmt::{Display, Formatter};

use lendgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{PermissionId, Scope};

/// Resource type or action value that matches every resource type or action.
pub const WILDCARD: &str = "*";

/// Resource types known to the platform catalog.
pub mod resource_type {
    /// Loan applications moving through the workflow.
    pub const APPLICATION: &str = "application";
    /// Roles and their permission sets.
    pub const ROLE: &str = "role";
    /// Permission templates.
    pub const TEMPLATE: &str = "template";
    /// User grants and assignments.
    pub const USER: &str = "user";
    /// Organizational positions and their capability map.
    pub const POSITION: &str = "position";
    /// Audit trail.
    pub const AUDIT: &str = "audit";
}

/// Actions known to the platform catalog.
pub mod action {
    /// Read access.
    pub const READ: &str = "read";
    /// Create access.
    pub const CREATE: &str = "create";
    /// Administrative mutation access.
    pub const MANAGE: &str = "manage";
    /// Teller processing of an application.
    pub const PROCESS: &str = "process";
    /// Manager approval of an application.
    pub const APPROVE: &str = "approve";
    /// Manager rejection of an application.
    pub const REJECT: &str = "reject";
}

/// Semantic permission triple, portable across environments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "PermissionKeyFields", into = "PermissionKeyFields")]
pub struct PermissionKey {
    resource_type: String,
    action: String,
    scope: Scope,
}

impl PermissionKey {
    /// Creates a normalized permission triple.
    pub fn new(
        resource_type: impl Into<String>,
        action: impl Into<String>,
        scope: Scope,
    ) -> AppResult<Self> {
        let resource_type = normalize_segment(resource_type.into(), "resource_type")?;
        let action = normalize_segment(action.into(), "action")?;

        Ok(Self {
            resource_type,
            action,
            scope,
        })
    }

    /// Returns the resource type segment.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        self.resource_type.as_str()
    }

    /// Returns the action segment.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns the scope segment.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns whether this triple applies to the resource type and action, ignoring scope.
    #[must_use]
    pub fn applies_to(&self, resource_type: &str, action: &str) -> bool {
        (self.resource_type == WILDCARD || self.resource_type == resource_type)
            && (self.action == WILDCARD || self.action == action)
    }
}

impl Display for PermissionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}:{}:{}",
            self.resource_type,
            self.action,
            self.scope.as_str()
        )
    }
}

#[derive(Serialize, Deserialize)]
struct PermissionKeyFields {
    resource_type: String,
    action: String,
    scope: Scope,
}

impl TryFrom<PermissionKeyFields> for PermissionKey {
    type Error = AppError;

    fn try_from(value: PermissionKeyFields) -> Result<Self, Self::Error> {
        Self::new(value.resource_type, value.action, value.scope)
    }
}

impl From<PermissionKey> for PermissionKeyFields {
    fn from(value: PermissionKey) -> Self {
        Self {
            resource_type: value.resource_type,
            action: value.action,
            scope: value.scope,
        }
    }
}

/// Catalog entry for one permission triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    /// Stable catalog identifier.
    pub permission_id: PermissionId,
    /// Semantic triple.
    pub key: PermissionKey,
    /// Optional operator-facing description.
    pub description: Option<String>,
    /// Inactive permissions never contribute to an effective set.
    pub is_active: bool,
}

fn normalize_segment(value: String, field_name: &str) -> AppResult<String> {
    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(AppError::Validation(format!(
            "permission {field_name} must not be empty"
        )));
    }

    if normalized != WILDCARD
        && !normalized
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '_')
    {
        return Err(AppError::Validation(format!(
            "permission {field_name} '{normalized}' must be '*' or contain only letters, digits and underscores"
        )));
    }

    Ok(normalized)
}
