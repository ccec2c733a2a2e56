use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a custom role is created.
    RoleCreated,
    /// Emitted when a role is materialized from a template.
    RoleCreatedFromTemplate,
    /// Emitted when role fields change.
    RoleUpdated,
    /// Emitted when a role is deleted.
    RoleDeleted,
    /// Emitted when a permission is linked to a role.
    RolePermissionGranted,
    /// Emitted when a permission is unlinked from a role.
    RolePermissionRevoked,
    /// Emitted when a role is assigned to a user.
    UserRoleAssigned,
    /// Emitted when a role assignment is revoked.
    UserRoleRevoked,
    /// Emitted when a direct permission override is granted.
    UserPermissionGranted,
    /// Emitted when a direct permission override is revoked.
    UserPermissionRevoked,
    /// Emitted when a user's organizational placement changes.
    UserPlacementUpdated,
    /// Emitted when a template is created.
    TemplateCreated,
    /// Emitted when a template is imported.
    TemplateImported,
    /// Emitted once per template application batch.
    TemplateApplied,
    /// Emitted when a position is created.
    PositionCreated,
    /// Emitted when a position is assigned to a user.
    PositionAssigned,
    /// Emitted when a position is removed from a user.
    PositionUnassigned,
    /// Emitted when a permission is mapped to a position.
    PositionPermissionGranted,
    /// Emitted when a permission is unmapped from a position.
    PositionPermissionRevoked,
    /// Emitted when a loan application draft is created.
    ApplicationCreated,
    /// Emitted when the owner completes a draft.
    Submitted,
    /// Emitted when a teller picks up an application.
    ProcessingStarted,
    /// Emitted when a teller forwards an application to a manager.
    ForwardedForReview,
    /// Emitted when a manager approves an application.
    Approved,
    /// Emitted when a manager rejects an application.
    Rejected,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCreated => "role_created",
            Self::RoleCreatedFromTemplate => "role_created_from_template",
            Self::RoleUpdated => "role_updated",
            Self::RoleDeleted => "role_deleted",
            Self::RolePermissionGranted => "role_permission_granted",
            Self::RolePermissionRevoked => "role_permission_revoked",
            Self::UserRoleAssigned => "user_role_assigned",
            Self::UserRoleRevoked => "user_role_revoked",
            Self::UserPermissionGranted => "user_permission_granted",
            Self::UserPermissionRevoked => "user_permission_revoked",
            Self::UserPlacementUpdated => "user_placement_updated",
            Self::TemplateCreated => "template_created",
            Self::TemplateImported => "template_imported",
            Self::TemplateApplied => "template_applied",
            Self::PositionCreated => "position_created",
            Self::PositionAssigned => "position_assigned",
            Self::PositionUnassigned => "position_unassigned",
            Self::PositionPermissionGranted => "position_permission_granted",
            Self::PositionPermissionRevoked => "position_permission_revoked",
            Self::ApplicationCreated => "application_created",
            Self::Submitted => "submitted",
            Self::ProcessingStarted => "processing_started",
            Self::ForwardedForReview => "forwarded_for_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Returns whether this action records a workflow transition.
    #[must_use]
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            Self::Submitted
                | Self::ProcessingStarted
                | Self::ForwardedForReview
                | Self::Approved
                | Self::Rejected
        )
    }
}

/// Entity families referenced by audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntityType {
    /// A role.
    Role,
    /// A permission template.
    Template,
    /// A user's grants or assignments.
    User,
    /// An organizational position.
    Position,
    /// A loan application.
    Application,
}

impl AuditEntityType {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Template => "template",
            Self::User => "user",
            Self::Position => "position",
            Self::Application => "application",
        }
    }
}
