use lendgate_domain::{PermissionId, PermissionKey, PermissionTemplate, TemplateId, TemplateTarget};

/// Input payload for creating custom templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTemplateInput {
    /// Unique template name.
    pub name: String,
    /// Template description.
    pub description: String,
    /// Bundled permissions.
    pub permission_ids: Vec<PermissionId>,
}

/// Outcome of a template import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateImportResult {
    /// Created or updated template.
    pub template: PermissionTemplate,
    /// Whether a new template was created.
    pub created: bool,
    /// Triples absent from the local catalog, skipped during import.
    pub unmapped_permissions: Vec<PermissionKey>,
}

/// Outcome of applying a template to a user or role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateApplication {
    /// Applied template.
    pub template_id: TemplateId,
    /// Recipient.
    pub target: TemplateTarget,
    /// Permissions the recipient did not hold before.
    pub granted_count: usize,
}
