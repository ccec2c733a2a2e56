//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod evaluation;
mod ids;
mod loan_workflow;
mod organization;
pub mod permission;
mod role;
mod scope;
mod template;

pub use audit::{AuditAction, AuditEntityType};
pub use evaluation::{Decision, EffectiveGrant, EffectivePermissionSet, GrantSource};
pub use ids::{
    ApplicationId, AuditEntryId, BranchId, DepartmentId, PermissionId, PositionId, RoleId, TeamId,
    TemplateId,
};
pub use loan_workflow::{
    ApprovalTerms, LoanApplication, PayloadField, RequiredCapability, TRANSITION_TABLE,
    TransitionPayload, TransitionRule, WorkflowState, find_transition,
};
pub use organization::{OrgPlacement, Position, ScopeContext};
pub use permission::{PermissionDefinition, PermissionKey, WILDCARD};
pub use role::{NAME_MAX_LENGTH, RoleDefinition, RoleUpdate, ensure_acyclic_parent};
pub use scope::Scope;
pub use template::{ImportMode, PermissionTemplate, PortableTemplate, TemplateKind, TemplateTarget};
