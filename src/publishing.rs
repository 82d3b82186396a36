//! Publishing and reverting templates.

use std::sync::Arc;

use uuid::Uuid;

use crate::db::Database;
use crate::error::{LandableError, Result};
use crate::models::{Author, Template, TemplateRevision};

/// Told about every successful publish, after the transaction commits.
///
/// Pages embedding a template implement this to re-render themselves.
pub trait PublishObserver: Send + Sync {
    fn template_published(&self, template: &Template, revision: &TemplateRevision);
}

/// Observer that only records the publish in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublishObserver;

impl PublishObserver for LogPublishObserver {
    fn template_published(&self, template: &Template, revision: &TemplateRevision) {
        tracing::info!(
            template_id = %template.id,
            revision_id = %revision.id,
            "template published, dependent pages should republish"
        );
    }
}

#[derive(Clone)]
pub struct Publisher {
    db: Database,
    observer: Arc<dyn PublishObserver>,
}

impl Publisher {
    pub fn new(db: Database, observer: Arc<dyn PublishObserver>) -> Self {
        Self { db, observer }
    }

    /// Snapshot the template's working copy as its new published revision.
    ///
    /// Exactly one revision of the template is published afterwards. The
    /// observer runs once, synchronously, before this returns.
    pub fn publish(&self, template_id: Uuid, author: &Author) -> Result<(Template, TemplateRevision)> {
        let (template, revision) = self
            .db
            .publish_template(template_id, author.id)?
            .ok_or_else(|| LandableError::not_found("template", template_id))?;

        tracing::info!(
            template_id = %template.id,
            revision_id = %revision.id,
            author = %author.username,
            "published template"
        );
        self.observer.template_published(&template, &revision);

        Ok((template, revision))
    }

    /// Copy a past revision's fields back over the working copy and save it.
    ///
    /// Which revision is published does not change; the reverted content
    /// goes live only when the template is published again. A revision that
    /// belongs to another template is reported as not found.
    pub fn revert(&self, template_id: Uuid, revision_id: Uuid) -> Result<Template> {
        let mut template = self
            .db
            .get_template(template_id)?
            .ok_or_else(|| LandableError::not_found("template", template_id))?;
        let revision = self
            .db
            .get_revision(revision_id)?
            .ok_or_else(|| LandableError::not_found("template revision", revision_id))?;

        template.revert_to(&revision)?;
        self.db.save_template(&mut template)?;

        tracing::info!(
            template_id = %template.id,
            revision_id = %revision.id,
            "reverted template working copy"
        );
        Ok(template)
    }

    /// Revert to a revision, looking its template up from the revision.
    pub fn revert_to_revision(&self, revision_id: Uuid) -> Result<Template> {
        let revision = self
            .db
            .get_revision(revision_id)?
            .ok_or_else(|| LandableError::not_found("template revision", revision_id))?;
        self.revert(revision.template_id, revision.id)
    }
}
