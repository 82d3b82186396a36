use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable snapshot of a template's editable fields.
///
/// Revisions are only created by publishing. After creation the only field
/// that ever changes is `is_published`, which is cleared when a newer
/// revision of the same template is published. At most one revision per
/// template is published at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateRevision {
    pub id: Uuid,
    pub template_id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub body: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// A template together with the revision that was just published from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedTemplate {
    #[serde(flatten)]
    pub template: super::Template,
    pub published_revision: TemplateRevision,
}
