use lendgate_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};

use crate::{BranchId, DepartmentId, PositionId, Scope, TeamId};

/// Where a user sits in the organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgPlacement {
    /// Team membership, when any.
    pub team_id: Option<TeamId>,
    /// Department membership, when any.
    pub department_id: Option<DepartmentId>,
    /// Branch membership, when any.
    pub branch_id: Option<BranchId>,
}

/// Organizational coordinates of the resource being accessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeContext {
    /// Owner of the resource, when it has one.
    pub owner_user_id: Option<UserId>,
    /// Team the resource belongs to.
    pub team_id: Option<TeamId>,
    /// Department the resource belongs to.
    pub department_id: Option<DepartmentId>,
    /// Branch the resource belongs to.
    pub branch_id: Option<BranchId>,
}

impl ScopeContext {
    /// Context for resources with no organizational coordinates; only GLOBAL grants apply.
    #[must_use]
    pub fn global() -> Self {
        Self::default()
    }

    /// Returns the narrowest scope at which the actor relates to this resource.
    ///
    /// A grant authorizes the access only when its scope covers the returned value.
    /// Missing coordinates on either side never match.
    #[must_use]
    pub fn required_scope(&self, actor: UserId, placement: &OrgPlacement) -> Scope {
        if self.owner_user_id == Some(actor) {
            return Scope::Own;
        }
        if same(self.team_id, placement.team_id) {
            return Scope::Team;
        }
        if same(self.department_id, placement.department_id) {
            return Scope::Department;
        }
        if same(self.branch_id, placement.branch_id) {
            return Scope::Branch;
        }

        Scope::Global
    }
}

fn same<T: PartialEq>(left: Option<T>, right: Option<T>) -> bool {
    matches!((left, right), (Some(left), Some(right)) if left == right)
}

/// Organizational position, referenced by stable id and code rather than title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Stable identifier.
    pub position_id: PositionId,
    /// Stable machine code, unique across positions.
    pub code: String,
    /// Human-readable title used for display only.
    pub title: String,
}

impl Position {
    /// Creates a position with a normalized code.
    pub fn new(
        position_id: PositionId,
        code: impl Into<String>,
        title: impl Into<String>,
    ) -> AppResult<Self> {
        let code = code.into().trim().to_ascii_lowercase();
        if code.is_empty()
            || !code
                .chars()
                .all(|character| character.is_ascii_alphanumeric() || character == '_')
        {
            return Err(AppError::Validation(format!(
                "position code '{code}' must contain only letters, digits and underscores"
            )));
        }

        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(AppError::Validation(
                "position title must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            position_id,
            code,
            title,
        })
    }
}

#[cfg(test)]
mod tests {
    use lendgate_core::UserId;

    use crate::{BranchId, DepartmentId, Scope, TeamId};

    use super::{OrgPlacement, Position, ScopeContext};

    #[test]
    fn position_code_is_a_stable_identifier() {
        let position = Position::new(crate::PositionId::new(), " Senior_Teller ", "Senior Teller");
        assert!(matches!(position, Ok(value) if value.code == "senior_teller"));
        assert!(Position::new(crate::PositionId::new(), "senior teller", "x").is_err());
    }

    #[test]
    fn owner_requires_only_own_scope() {
        let owner = UserId::new();
        let context = ScopeContext {
            owner_user_id: Some(owner),
            ..ScopeContext::default()
        };

        assert_eq!(
            context.required_scope(owner, &OrgPlacement::default()),
            Scope::Own
        );
    }

    #[test]
    fn department_match_requires_department_scope() {
        let department_id = DepartmentId::new();
        let branch_id = BranchId::new();
        let context = ScopeContext {
            owner_user_id: Some(UserId::new()),
            team_id: Some(TeamId::new()),
            department_id: Some(department_id),
            branch_id: Some(branch_id),
        };
        let placement = OrgPlacement {
            team_id: Some(TeamId::new()),
            department_id: Some(department_id),
            branch_id: Some(branch_id),
        };

        assert_eq!(
            context.required_scope(UserId::new(), &placement),
            Scope::Department
        );
    }

    #[test]
    fn unplaced_actor_requires_global_scope() {
        let context = ScopeContext {
            branch_id: Some(BranchId::new()),
            ..ScopeContext::default()
        };

        assert_eq!(
            context.required_scope(UserId::new(), &OrgPlacement::default()),
            Scope::Global
        );
    }
}
