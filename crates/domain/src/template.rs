use std::str::FromStr;

use lendgate_core::{AppError, AppResult, NonEmptyString, UserId};
use serde::{Deserialize, Serialize};

use crate::{PermissionId, PermissionKey, RoleId, TemplateId, role::validate_name};

/// Origin of a permission template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// Shipped with the platform.
    System,
    /// Created by administrators.
    Custom,
}

impl TemplateKind {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for TemplateKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "system" => Ok(Self::System),
            "custom" => Ok(Self::Custom),
            _ => Err(AppError::Validation(format!(
                "unknown template kind '{value}'"
            ))),
        }
    }
}

/// Reusable permission bundle decoupled from any role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionTemplate {
    template_id: TemplateId,
    name: NonEmptyString,
    description: String,
    kind: TemplateKind,
    is_active: bool,
    usage_count: u32,
    permissions: Vec<PermissionId>,
}

impl PermissionTemplate {
    /// Creates an active custom template.
    pub fn new(
        template_id: TemplateId,
        name: impl Into<String>,
        description: impl Into<String>,
        permissions: Vec<PermissionId>,
    ) -> AppResult<Self> {
        Self::restore(
            template_id,
            name,
            description,
            TemplateKind::Custom,
            true,
            0,
            permissions,
        )
    }

    /// Rebuilds a template from persisted state.
    pub fn restore(
        template_id: TemplateId,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: TemplateKind,
        is_active: bool,
        usage_count: u32,
        permissions: Vec<PermissionId>,
    ) -> AppResult<Self> {
        let mut template = Self {
            template_id,
            name: validate_name(name.into())?,
            description: description.into().trim().to_owned(),
            kind,
            is_active,
            usage_count,
            permissions: Vec::new(),
        };
        template.replace_permissions(permissions);
        Ok(template)
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    /// Returns the unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the template origin.
    #[must_use]
    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Returns whether the template can seed roles or users.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns how many roles were materialized from this template.
    #[must_use]
    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    /// Returns the bundled permissions.
    #[must_use]
    pub fn permissions(&self) -> &[PermissionId] {
        self.permissions.as_slice()
    }

    /// Fails with `InvalidTemplate` when the template is inactive.
    pub fn ensure_usable(&self) -> AppResult<()> {
        if !self.is_active {
            return Err(AppError::InvalidTemplate(format!(
                "template '{}' is inactive",
                self.name.as_str()
            )));
        }

        Ok(())
    }

    /// Replaces the permission set, dropping duplicates while keeping first occurrence order.
    pub fn replace_permissions(&mut self, permissions: Vec<PermissionId>) {
        self.permissions.clear();
        for permission_id in permissions {
            if !self.permissions.contains(&permission_id) {
                self.permissions.push(permission_id);
            }
        }
    }
}

/// Environment-independent template representation used for export and import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableTemplate {
    /// Template name, used to match on `update_if_exists` imports.
    pub name: String,
    /// Template description.
    #[serde(default)]
    pub description: String,
    /// Semantic triples, never catalog identifiers.
    pub permissions: Vec<PermissionKey>,
}

/// How an import treats an existing template with the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Always create; a duplicate name is a conflict.
    CreateNew,
    /// Replace the permission set of the same-named template, creating it when absent.
    UpdateIfExists,
}

impl FromStr for ImportMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create_new" => Ok(Self::CreateNew),
            "update_if_exists" => Ok(Self::UpdateIfExists),
            _ => Err(AppError::Validation(format!(
                "unknown import mode '{value}'"
            ))),
        }
    }
}

/// Recipient of a template application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target_type", content = "target_id", rename_all = "snake_case")]
pub enum TemplateTarget {
    /// Permissions become direct user overrides.
    User(UserId),
    /// Permissions become role-permission links.
    Role(RoleId),
}

impl TemplateTarget {
    /// Parses a transport `(target_type, target_id)` pair.
    pub fn from_transport(target_type: &str, target_id: &str) -> AppResult<Self> {
        match target_type {
            "user" => Ok(Self::User(UserId::from_str(target_id)?)),
            "role" => Ok(Self::Role(RoleId::from_str(target_id)?)),
            _ => Err(AppError::Validation(format!(
                "unknown template target type '{target_type}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use lendgate_core::{AppError, UserId};

    use crate::{PermissionId, PermissionKey, Scope, TemplateId};

    use super::{PermissionTemplate, PortableTemplate, TemplateKind, TemplateTarget};

    #[test]
    fn inactive_template_is_not_usable() {
        let template = PermissionTemplate::restore(
            TemplateId::new(),
            "retired",
            "",
            TemplateKind::Custom,
            false,
            3,
            Vec::new(),
        );
        let Ok(template) = template else {
            panic!("template should restore");
        };

        assert!(matches!(
            template.ensure_usable(),
            Err(AppError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn duplicate_permissions_are_dropped() {
        let permission_id = PermissionId::new();
        let template = PermissionTemplate::new(
            TemplateId::new(),
            "bundle",
            "desc",
            vec![permission_id, permission_id],
        );

        assert!(matches!(template, Ok(value) if value.permissions() == [permission_id]));
    }

    #[test]
    fn portable_template_uses_semantic_triples_only() {
        let Ok(key) = PermissionKey::new("application", "approve", Scope::Department) else {
            panic!("key should be valid");
        };
        let portable = PortableTemplate {
            name: "credit_officer_template".to_owned(),
            description: "Credit officers".to_owned(),
            permissions: vec![key],
        };

        let Ok(encoded) = serde_json::to_value(&portable) else {
            panic!("portable template should serialize");
        };
        assert_eq!(
            encoded,
            serde_json::json!({
                "name": "credit_officer_template",
                "description": "Credit officers",
                "permissions": [
                    {"resource_type": "application", "action": "approve", "scope": "DEPARTMENT"}
                ]
            })
        );
    }

    #[test]
    fn template_target_parses_transport_values() {
        let user_id = UserId::new();
        let target = TemplateTarget::from_transport("user", user_id.to_string().as_str());
        assert!(matches!(target, Ok(TemplateTarget::User(value)) if value == user_id));
        assert!(TemplateTarget::from_transport("team", "x").is_err());
    }
}
