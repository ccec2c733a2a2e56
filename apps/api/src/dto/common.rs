use std::str::FromStr;

use lendgate_core::{AppError, AppResult};
use lendgate_domain::{EffectiveGrant, GrantSource, PermissionKey, Scope};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Semantic permission triple on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-key-dto.ts"
)]
pub struct PermissionKeyDto {
    pub resource_type: String,
    pub action: String,
    pub scope: String,
}

/// One effective permission with the path that granted it.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/effective-grant-response.ts"
)]
pub struct EffectiveGrantResponse {
    pub permission: PermissionKeyDto,
    /// `role`, `override` or `position`.
    pub source_type: String,
    pub source_id: Option<String>,
}

impl From<PermissionKey> for PermissionKeyDto {
    fn from(value: PermissionKey) -> Self {
        Self {
            resource_type: value.resource_type().to_owned(),
            action: value.action().to_owned(),
            scope: value.scope().as_str().to_owned(),
        }
    }
}

impl TryFrom<PermissionKeyDto> for PermissionKey {
    type Error = AppError;

    fn try_from(value: PermissionKeyDto) -> Result<Self, Self::Error> {
        PermissionKey::new(
            value.resource_type,
            value.action,
            Scope::from_str(value.scope.as_str())?,
        )
    }
}

impl From<EffectiveGrant> for EffectiveGrantResponse {
    fn from(value: EffectiveGrant) -> Self {
        let (source_type, source_id) = match value.source {
            GrantSource::Role(role_id) => ("role", Some(role_id.to_string())),
            GrantSource::Override => ("override", None),
            GrantSource::Position(position_id) => ("position", Some(position_id.to_string())),
        };

        Self {
            permission: value.key.into(),
            source_type: source_type.to_owned(),
            source_id,
        }
    }
}

/// Parses an optional transport identifier.
pub(crate) fn parse_optional_id<T>(value: Option<&str>) -> AppResult<Option<T>>
where
    T: FromStr<Err = AppError>,
{
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(T::from_str)
        .transpose()
}

/// Parses a list of transport identifiers, failing on the first malformed one.
pub(crate) fn parse_ids<T>(values: &[String]) -> AppResult<Vec<T>>
where
    T: FromStr<Err = AppError>,
{
    values.iter().map(|value| T::from_str(value)).collect()
}

#[cfg(test)]
mod tests {
    use lendgate_core::AppError;
    use lendgate_domain::{EffectiveGrant, GrantSource, PermissionKey, RoleId, Scope};

    use super::{EffectiveGrantResponse, PermissionKeyDto, parse_ids, parse_optional_id};

    #[test]
    fn permission_key_round_trips_through_transport_fields() {
        let Ok(key) = PermissionKey::new("application", "approve", Scope::Branch) else {
            panic!("valid key");
        };

        let dto = PermissionKeyDto::from(key.clone());
        assert_eq!(dto.scope, "BRANCH");
        assert!(matches!(PermissionKey::try_from(dto), Ok(parsed) if parsed == key));
    }

    #[test]
    fn unknown_scope_is_a_validation_error() {
        let dto = PermissionKeyDto {
            resource_type: "application".to_owned(),
            action: "read".to_owned(),
            scope: "PLANET".to_owned(),
        };
        assert!(matches!(
            PermissionKey::try_from(dto),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn grant_response_names_its_source() {
        let role_id = RoleId::new();
        let Ok(key) = PermissionKey::new("application", "process", Scope::Team) else {
            panic!("valid key");
        };

        let response = EffectiveGrantResponse::from(EffectiveGrant {
            key,
            source: GrantSource::Role(role_id),
        });
        assert_eq!(response.source_type, "role");
        assert_eq!(response.source_id, Some(role_id.to_string()));
    }

    #[test]
    fn identifier_parsing_skips_blanks_and_rejects_garbage() {
        assert!(matches!(parse_optional_id::<RoleId>(Some("  ")), Ok(None)));
        assert!(matches!(parse_optional_id::<RoleId>(None), Ok(None)));
        assert!(matches!(
            parse_ids::<RoleId>(&["not-a-uuid".to_owned()]),
            Err(AppError::Validation(_))
        ));
    }
}
