use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TemplateRevision;
use crate::error::{LandableError, Result, ValidationErrors};
use crate::slug::normalize_slug;

/// The editable working copy of a template.
///
/// Edits go to the working copy only. Publishing snapshots it into a
/// [`TemplateRevision`] and points `published_revision_id` at that snapshot;
/// reverting copies a snapshot back over the working copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    /// `None` until either assigned explicitly or derived from the name.
    pub slug: Option<String>,
    pub description: String,
    pub body: String,
    /// Raw file backing a partial template.
    pub file: Option<String>,
    pub published_revision_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Build an unsaved template from explicit fields.
    ///
    /// An explicit slug wins over the name; without one the slug is derived
    /// from the name.
    pub fn new(input: CreateTemplateInput) -> Self {
        let now = Utc::now();
        let mut template = Self {
            id: Uuid::new_v4(),
            name: String::new(),
            slug: input.slug.filter(|s| !s.trim().is_empty()),
            description: input.description.unwrap_or_default(),
            body: input.body.unwrap_or_default(),
            file: input.file.filter(|f| !f.is_empty()),
            published_revision_id: None,
            created_at: now,
            updated_at: now,
        };
        template.set_name(input.name);
        template
    }

    /// Assign the name, deriving the slug from it when no slug is set yet.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        if self.slug.is_none() && !self.name.trim().is_empty() {
            self.slug = Some(normalize_slug(&self.name));
        }
    }

    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    pub fn is_partial(&self) -> bool {
        self.file.is_some()
    }

    /// Normalize derived fields before saving. Explicit slugs containing
    /// whitespace are rewritten the same way derived ones are.
    pub fn normalize(&mut self) {
        if let Some(slug) = self.slug.as_mut() {
            *slug = normalize_slug(slug);
        }
        if self.slug.as_deref() == Some("") {
            self.slug = None;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        errors.require("name", Some(&self.name));
        errors.require("description", Some(&self.description));
        errors.require("slug", self.slug.as_deref());
        errors.into_result()
    }

    /// Apply a partial update. Renaming never overwrites an existing slug.
    pub fn apply(&mut self, input: UpdateTemplateInput) {
        if let Some(slug) = input.slug {
            self.slug = Some(slug);
        }
        if let Some(name) = input.name {
            self.set_name(name);
        }
        if let Some(description) = input.description {
            self.description = description;
        }
        if let Some(body) = input.body {
            self.body = body;
        }
        if let Some(file) = input.file {
            self.file = Some(file).filter(|f| !f.is_empty());
        }
    }

    /// Snapshot the working copy as a new, not yet published revision.
    pub fn snapshot(&self, author_id: Uuid) -> TemplateRevision {
        TemplateRevision {
            id: Uuid::new_v4(),
            template_id: self.id,
            author_id,
            name: self.name.clone(),
            body: self.body.clone(),
            description: self.description.clone(),
            slug: self.slug.clone().unwrap_or_default(),
            is_published: false,
            created_at: Utc::now(),
        }
    }

    /// Overwrite the working copy with a revision's snapshotted fields.
    ///
    /// Publish state is left alone: the reverted content only goes live once
    /// the template is published again. Revisions of other templates are
    /// rejected.
    pub fn revert_to(&mut self, revision: &TemplateRevision) -> Result<()> {
        if revision.template_id != self.id {
            return Err(LandableError::not_found("template revision", revision.id));
        }
        self.name = revision.name.clone();
        self.body = revision.body.clone();
        self.description = revision.description.clone();
        self.slug = Some(revision.slug.clone());
        Ok(())
    }
}

/// Input for creating a template. Unknown fields are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTemplateInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub file: Option<String>,
}

/// Input for updating a template. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTemplateInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    /// An empty string clears the file reference.
    pub file: Option<String>,
}

/// Lookup used by the tag renderer to resolve embedded template references.
pub trait TemplateLookup {
    fn find_by_slug(&self, slug: &str) -> Result<Option<Template>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(slug: Option<&str>) -> Template {
        Template::new(CreateTemplateInput {
            name: "Base".to_string(),
            slug: slug.map(str::to_string),
            description: Some("A template".to_string()),
            body: Some("<div></div>".to_string()),
            file: None,
        })
    }

    #[test]
    fn name_assigns_slug_when_unset() {
        let mut template = build(None);
        template.slug = None;
        template.set_name("Six Seven");
        assert_eq!(template.name, "Six Seven");
        assert_eq!(template.slug(), Some("six_seven"));
    }

    #[test]
    fn name_leaves_explicit_slug_alone() {
        let mut template = build(Some("six"));
        template.set_name("seven");
        assert_eq!(template.name, "seven");
        assert_eq!(template.slug(), Some("six"));
    }

    #[test]
    fn derived_slug_sticks_after_rename() {
        let mut template = build(None);
        assert_eq!(template.slug(), Some("base"));
        template.set_name("Other Name");
        assert_eq!(template.slug(), Some("base"));
    }

    #[test]
    fn normalize_rewrites_spaced_slug() {
        let mut template = build(Some("I have no space"));
        template.set_name("No Space");
        template.normalize();
        assert_eq!(template.slug(), Some("i_have_no_space"));
    }

    #[test]
    fn validate_requires_name_description_slug() {
        let mut template = build(None);
        template.name = String::new();
        template.description = " ".to_string();
        template.slug = None;

        match template.validate() {
            Err(LandableError::Validation(errors)) => {
                assert!(errors.contains("name"));
                assert!(errors.contains("description"));
                assert!(errors.contains("slug"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn partial_depends_on_file() {
        let mut template = build(None);
        assert!(!template.is_partial());
        template.file = Some("partials/footer.liquid".to_string());
        assert!(template.is_partial());
    }

    #[test]
    fn empty_file_is_not_a_partial() {
        let created = Template::new(CreateTemplateInput {
            name: "Base".to_string(),
            description: Some("A template".to_string()),
            file: Some(String::new()),
            ..Default::default()
        });
        assert!(!created.is_partial());

        let mut updated = build(None);
        updated.apply(UpdateTemplateInput {
            file: Some("partials/footer.liquid".to_string()),
            ..Default::default()
        });
        assert!(updated.is_partial());
        updated.apply(UpdateTemplateInput {
            file: Some(String::new()),
            ..Default::default()
        });
        assert!(!updated.is_partial());
    }

    #[test]
    fn snapshot_copies_working_fields() {
        let template = build(Some("base"));
        let author_id = Uuid::new_v4();
        let revision = template.snapshot(author_id);

        assert_eq!(revision.template_id, template.id);
        assert_eq!(revision.author_id, author_id);
        assert_eq!(revision.name, template.name);
        assert_eq!(revision.body, template.body);
        assert_eq!(revision.description, template.description);
        assert_eq!(revision.slug, "base");
        assert!(!revision.is_published);
    }

    #[test]
    fn revert_copies_fields_without_touching_publish_state() {
        let mut template = build(Some("base"));
        let revision = template.snapshot(Uuid::new_v4());
        let published = Some(Uuid::new_v4());
        template.published_revision_id = published;

        template.set_name("Changed");
        template.body = "changed".to_string();
        template.description = "changed".to_string();
        template.slug = Some("changed".to_string());

        template.revert_to(&revision).unwrap();

        assert_eq!(template.name, "Base");
        assert_eq!(template.body, "<div></div>");
        assert_eq!(template.description, "A template");
        assert_eq!(template.slug(), Some("base"));
        assert_eq!(template.published_revision_id, published);
    }

    #[test]
    fn revert_rejects_foreign_revision() {
        let mut template = build(Some("base"));
        let other = build(Some("other"));
        let revision = other.snapshot(Uuid::new_v4());

        let result = template.revert_to(&revision);

        assert!(matches!(result, Err(LandableError::NotFound { .. })));
        assert_eq!(template.slug(), Some("base"));
    }

    #[test]
    fn unknown_input_fields_are_rejected() {
        let result = serde_json::from_value::<CreateTemplateInput>(serde_json::json!({
            "name": "x",
            "is_admin": true
        }));
        assert!(result.is_err());
    }
}
