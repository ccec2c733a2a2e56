use lendgate_core::AppResult;
use lendgate_domain::{Decision, ScopeContext};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::common::{EffectiveGrantResponse, parse_optional_id};

/// Authorization question asked on behalf of the calling actor.
///
/// Context fields describe the target resource; all absent means a global
/// resource.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/authorize-request.ts"
)]
pub struct AuthorizeRequest {
    pub resource_type: String,
    pub action: String,
    #[serde(default)]
    pub owner_user_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

/// Evaluator answer.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/authorize-response.ts"
)]
pub struct AuthorizeResponse {
    pub allowed: bool,
    pub matched: Option<EffectiveGrantResponse>,
}

impl AuthorizeRequest {
    pub fn scope_context(&self) -> AppResult<ScopeContext> {
        Ok(ScopeContext {
            owner_user_id: parse_optional_id(self.owner_user_id.as_deref())?,
            team_id: parse_optional_id(self.team_id.as_deref())?,
            department_id: parse_optional_id(self.department_id.as_deref())?,
            branch_id: parse_optional_id(self.branch_id.as_deref())?,
        })
    }
}

impl From<Decision> for AuthorizeResponse {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Allow { matched } => Self {
                allowed: true,
                matched: Some(matched.into()),
            },
            Decision::Deny => Self {
                allowed: false,
                matched: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use lendgate_domain::{
        Decision, EffectiveGrant, GrantSource, PermissionKey, Scope, ScopeContext,
    };

    use super::{AuthorizeRequest, AuthorizeResponse};

    #[test]
    fn request_without_context_is_global() {
        let request = AuthorizeRequest {
            resource_type: "audit".to_owned(),
            action: "read".to_owned(),
            owner_user_id: None,
            team_id: None,
            department_id: None,
            branch_id: None,
        };

        assert!(matches!(request.scope_context(), Ok(context) if context == ScopeContext::global()));
    }

    #[test]
    fn decisions_map_to_allowed_flag_and_match() {
        let Ok(key) = PermissionKey::new("*", "*", Scope::Global) else {
            panic!("valid key");
        };

        let allowed = AuthorizeResponse::from(Decision::Allow {
            matched: EffectiveGrant {
                key,
                source: GrantSource::Override,
            },
        });
        assert!(allowed.allowed);
        assert!(matches!(allowed.matched, Some(grant) if grant.source_type == "override"));

        let denied = AuthorizeResponse::from(Decision::Deny);
        assert!(!denied.allowed);
        assert!(denied.matched.is_none());
    }
}
