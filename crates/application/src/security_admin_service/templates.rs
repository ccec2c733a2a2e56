use std::collections::HashMap;

use super::*;

use lendgate_domain::{
    ImportMode, PermissionKey, PermissionTemplate, PortableTemplate, TemplateId, TemplateTarget,
};

use crate::security_admin_ports::{
    CreateTemplateInput, TemplateApplication, TemplateImportResult,
};

impl SecurityAdminService {
    /// Returns every template.
    pub async fn list_templates(
        &self,
        actor: &ActorIdentity,
    ) -> AppResult<Vec<PermissionTemplate>> {
        self.require_global(actor, resource_type::TEMPLATE, action::READ)
            .await?;
        self.repository.list_templates().await
    }

    /// Returns one template.
    pub async fn get_template(
        &self,
        actor: &ActorIdentity,
        template_id: TemplateId,
    ) -> AppResult<PermissionTemplate> {
        self.require_global(actor, resource_type::TEMPLATE, action::READ)
            .await?;
        self.load_template(template_id).await
    }

    /// Creates a custom template.
    pub async fn create_template(
        &self,
        actor: &ActorIdentity,
        input: CreateTemplateInput,
    ) -> AppResult<PermissionTemplate> {
        self.require_template_manage(actor).await?;
        self.ensure_permissions_exist(&input.permission_ids).await?;

        let template = PermissionTemplate::new(
            TemplateId::new(),
            input.name,
            input.description,
            input.permission_ids,
        )?;

        let event = Self::template_event(actor, AuditAction::TemplateCreated, &template);
        self.repository.insert_template(&template, event).await?;
        self.invalidate_role_cache().await;

        Ok(template)
    }

    /// Exports a template as semantic triples, free of local identifiers.
    pub async fn export_template(
        &self,
        actor: &ActorIdentity,
        template_id: TemplateId,
    ) -> AppResult<PortableTemplate> {
        let template = self.get_template(actor, template_id).await?;
        let catalog = self
            .repository
            .list_permissions()
            .await?
            .into_iter()
            .map(|permission| (permission.permission_id, permission.key))
            .collect::<HashMap<_, _>>();

        let permissions = template
            .permissions()
            .iter()
            .map(|permission_id| {
                catalog.get(permission_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!(
                        "template '{}' references unknown permission '{permission_id}'",
                        template.name()
                    ))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PortableTemplate {
            name: template.name().to_owned(),
            description: template.description().to_owned(),
            permissions,
        })
    }

    /// Imports a portable template; triples missing from the catalog are reported and skipped.
    pub async fn import_template(
        &self,
        actor: &ActorIdentity,
        portable: PortableTemplate,
        mode: ImportMode,
    ) -> AppResult<TemplateImportResult> {
        self.require_template_manage(actor).await?;

        let mut requested = Vec::<PermissionKey>::new();
        for key in portable.permissions {
            if !requested.contains(&key) {
                requested.push(key);
            }
        }

        let resolved = self
            .repository
            .find_permissions_by_keys(&requested)
            .await?
            .into_iter()
            .map(|permission| (permission.key, permission.permission_id))
            .collect::<HashMap<_, _>>();
        let (mapped, unmapped): (Vec<_>, Vec<_>) = requested
            .into_iter()
            .partition(|key| resolved.contains_key(key));
        let permission_ids = mapped
            .iter()
            .filter_map(|key| resolved.get(key).copied())
            .collect::<Vec<_>>();

        let existing = self
            .repository
            .find_template_by_name(portable.name.trim())
            .await?;

        let (template, created) = match (existing, mode) {
            (Some(existing), ImportMode::CreateNew) => {
                return Err(AppError::Conflict(format!(
                    "template '{}' already exists",
                    existing.name()
                )));
            }
            (Some(mut template), ImportMode::UpdateIfExists) => {
                template.replace_permissions(permission_ids);
                let event = Self::template_event(actor, AuditAction::TemplateImported, &template)
                    .with_metadata(import_metadata(&template, mode, &unmapped));
                self.repository
                    .replace_template_permissions(&template, event)
                    .await?;
                (template, false)
            }
            (None, _) => {
                let template = PermissionTemplate::new(
                    TemplateId::new(),
                    portable.name,
                    portable.description,
                    permission_ids,
                )?;
                let event = Self::template_event(actor, AuditAction::TemplateImported, &template)
                    .with_metadata(import_metadata(&template, mode, &unmapped));
                self.repository.insert_template(&template, event).await?;
                (template, true)
            }
        };
        self.invalidate_role_cache().await;

        Ok(TemplateImportResult {
            template,
            created,
            unmapped_permissions: unmapped,
        })
    }

    /// Grants every template permission to a user or role, recorded as one audit entry.
    pub async fn apply_template(
        &self,
        actor: &ActorIdentity,
        template_id: TemplateId,
        target: TemplateTarget,
    ) -> AppResult<TemplateApplication> {
        self.require_template_manage(actor).await?;

        let template = self.load_template(template_id).await?;
        template.ensure_usable()?;

        let event = Self::template_event(actor, AuditAction::TemplateApplied, &template);
        let granted_count = match target {
            TemplateTarget::User(user_id) => {
                self.require_user_access(actor, user_id, action::MANAGE)
                    .await?;
                self.require_delegable(actor, template.permissions()).await?;
                let event = event.with_target(user_id).with_metadata(json!({
                    "template_name": template.name(),
                    "target_type": "user",
                    "target_id": user_id,
                    "permission_count": template.permissions().len(),
                }));
                self.repository
                    .grant_permission_overrides(user_id, template.permissions(), event)
                    .await?
            }
            TemplateTarget::Role(role_id) => {
                self.require_role_manage(actor).await?;
                let role = self.load_role(role_id).await?;
                role.ensure_mutable()?;
                let event = event.with_metadata(json!({
                    "template_name": template.name(),
                    "target_type": "role",
                    "target_id": role_id,
                    "permission_count": template.permissions().len(),
                }));
                self.repository
                    .add_role_permissions(role_id, template.permissions(), event)
                    .await?
            }
        };
        self.invalidate_role_cache().await;

        Ok(TemplateApplication {
            template_id,
            target,
            granted_count,
        })
    }

    async fn load_template(&self, template_id: TemplateId) -> AppResult<PermissionTemplate> {
        self.repository
            .find_template(template_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("template '{template_id}' was not found")))
    }

    fn template_event(
        actor: &ActorIdentity,
        action: AuditAction,
        template: &PermissionTemplate,
    ) -> AuditEvent {
        AuditEvent::new(
            actor,
            action,
            AuditEntityType::Template,
            template.template_id().to_string(),
        )
        .with_metadata(json!({
            "template_name": template.name(),
            "permission_count": template.permissions().len(),
        }))
    }
}

fn import_metadata(
    template: &PermissionTemplate,
    mode: ImportMode,
    unmapped: &[PermissionKey],
) -> serde_json::Value {
    json!({
        "template_name": template.name(),
        "mode": mode,
        "permission_count": template.permissions().len(),
        "unmapped_permissions": unmapped
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    })
}
