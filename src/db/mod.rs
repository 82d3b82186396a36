mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{LandableError, Result, ValidationErrors};
use crate::models::*;

const TEMPLATE_COLUMNS: &str =
    "id, name, slug, description, body, file, published_revision_id, created_at, updated_at";

const REVISION_COLUMNS: &str =
    "id, template_id, author_id, name, body, description, slug, is_published, created_at";

const AUTHOR_COLUMNS: &str = "id, username, email, first_name, last_name, created_at";

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> anyhow::Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "landable")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("landable.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.lock();
        schema::run_migrations(&conn)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database lock poisoned")
    }

    // ============================================================
    // Author operations
    // ============================================================

    pub fn create_author(&self, input: CreateAuthorInput) -> Result<Author> {
        let mut errors = ValidationErrors::new();
        errors.require("username", Some(&input.username));
        errors.require("email", Some(&input.email));
        errors.into_result()?;

        let conn = self.lock();
        if query_author_by_username(&conn, &input.username)?.is_some() {
            let mut errors = ValidationErrors::new();
            errors.add("username", "has already been taken");
            return Err(errors.into());
        }

        let author = Author {
            id: Uuid::new_v4(),
            username: input.username,
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO authors (id, username, email, first_name, last_name, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                author.id.to_string(),
                &author.username,
                &author.email,
                &author.first_name,
                &author.last_name,
                author.created_at.to_rfc3339(),
            ),
        )?;

        Ok(author)
    }

    pub fn get_author(&self, id: Uuid) -> Result<Option<Author>> {
        let conn = self.lock();
        let author = conn
            .query_row(
                &format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE id = ?"),
                [id.to_string()],
                author_from_row,
            )
            .optional()?;
        Ok(author)
    }

    /// Exact, case-sensitive username match.
    pub fn get_author_by_username(&self, username: &str) -> Result<Option<Author>> {
        let conn = self.lock();
        query_author_by_username(&conn, username)
    }

    // ============================================================
    // Access token operations
    // ============================================================

    pub fn create_access_token(
        &self,
        author_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessToken> {
        let conn = self.lock();
        let token = AccessToken {
            id: Uuid::new_v4(),
            author_id,
            expires_at,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO access_tokens (id, author_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
            (
                token.id.to_string(),
                author_id.to_string(),
                token.expires_at.to_rfc3339(),
                token.created_at.to_rfc3339(),
            ),
        )?;

        Ok(token)
    }

    /// Find a token by id, only if it belongs to `author_id`.
    pub fn get_access_token(&self, author_id: Uuid, token_id: Uuid) -> Result<Option<AccessToken>> {
        let conn = self.lock();
        let token = conn
            .query_row(
                "SELECT id, author_id, expires_at, created_at
                 FROM access_tokens WHERE id = ? AND author_id = ?",
                [token_id.to_string(), author_id.to_string()],
                |row| {
                    Ok(AccessToken {
                        id: parse_uuid(row.get::<_, String>(0)?),
                        author_id: parse_uuid(row.get::<_, String>(1)?),
                        expires_at: parse_datetime(row.get::<_, String>(2)?),
                        created_at: parse_datetime(row.get::<_, String>(3)?),
                    })
                },
            )
            .optional()?;
        Ok(token)
    }

    /// Move a token's expiry. Used by operators to revoke or extend access.
    pub fn set_access_token_expiry(&self, token_id: Uuid, expires_at: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute(
            "UPDATE access_tokens SET expires_at = ? WHERE id = ?",
            (expires_at.to_rfc3339(), token_id.to_string()),
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Template operations
    // ============================================================

    pub fn get_all_templates(&self) -> Result<Vec<Template>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare(&format!("SELECT {TEMPLATE_COLUMNS} FROM templates ORDER BY name"))?;

        let templates = stmt
            .query_map([], template_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(templates)
    }

    pub fn get_template(&self, id: Uuid) -> Result<Option<Template>> {
        let conn = self.lock();
        query_template(&conn, id)
    }

    pub fn get_template_by_slug(&self, slug: &str) -> Result<Option<Template>> {
        let conn = self.lock();
        let template = conn
            .query_row(
                &format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE slug = ?"),
                [slug],
                template_from_row,
            )
            .optional()?;
        Ok(template)
    }

    pub fn create_template(&self, input: CreateTemplateInput) -> Result<Template> {
        let mut template = Template::new(input);
        template.normalize();
        template.validate()?;

        let conn = self.lock();
        ensure_slug_available(&conn, &template)?;

        conn.execute(
            &format!("INSERT INTO templates ({TEMPLATE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            (
                template.id.to_string(),
                &template.name,
                &template.slug,
                &template.description,
                &template.body,
                &template.file,
                template.published_revision_id.map(|u| u.to_string()),
                template.created_at.to_rfc3339(),
                template.updated_at.to_rfc3339(),
            ),
        )?;

        tracing::debug!(template_id = %template.id, slug = ?template.slug, "created template");
        Ok(template)
    }

    pub fn update_template(&self, id: Uuid, input: UpdateTemplateInput) -> Result<Option<Template>> {
        let conn = self.lock();
        let Some(mut template) = query_template(&conn, id)? else {
            return Ok(None);
        };

        template.apply(input);
        save_template(&conn, &mut template)?;
        Ok(Some(template))
    }

    /// Persist a modified working copy. Runs the same normalization and
    /// validation as [`Database::create_template`].
    pub fn save_template(&self, template: &mut Template) -> Result<()> {
        let conn = self.lock();
        if query_template(&conn, template.id)?.is_none() {
            return Err(LandableError::not_found("template", template.id));
        }
        save_template(&conn, template)
    }

    // ============================================================
    // Revision operations
    // ============================================================

    /// Revisions of a template, oldest first.
    pub fn get_template_revisions(&self, template_id: Uuid) -> Result<Vec<TemplateRevision>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {REVISION_COLUMNS} FROM template_revisions
             WHERE template_id = ? ORDER BY created_at, rowid"
        ))?;

        let revisions = stmt
            .query_map([template_id.to_string()], revision_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(revisions)
    }

    pub fn get_revision(&self, id: Uuid) -> Result<Option<TemplateRevision>> {
        let conn = self.lock();
        query_revision(&conn, id)
    }

    /// Snapshot a template into a new published revision.
    ///
    /// Creating the revision, clearing the previous published flag and
    /// moving `published_revision_id` happen in one transaction. An invalid
    /// template fails before anything is written. Returns `None` when the
    /// template does not exist.
    pub fn publish_template(
        &self,
        id: Uuid,
        author_id: Uuid,
    ) -> Result<Option<(Template, TemplateRevision)>> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let Some(mut template) = query_template(&tx, id)? else {
            return Ok(None);
        };
        template.validate()?;

        let mut revision = template.snapshot(author_id);
        revision.is_published = true;

        tx.execute(
            "UPDATE template_revisions SET is_published = 0
             WHERE template_id = ? AND is_published = 1",
            [id.to_string()],
        )?;

        tx.execute(
            &format!(
                "INSERT INTO template_revisions ({REVISION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            (
                revision.id.to_string(),
                revision.template_id.to_string(),
                revision.author_id.to_string(),
                &revision.name,
                &revision.body,
                &revision.description,
                &revision.slug,
                revision.is_published,
                revision.created_at.to_rfc3339(),
            ),
        )?;

        let now = Utc::now();
        tx.execute(
            "UPDATE templates SET published_revision_id = ?, updated_at = ? WHERE id = ?",
            (revision.id.to_string(), now.to_rfc3339(), id.to_string()),
        )?;

        tx.commit()?;

        template.published_revision_id = Some(revision.id);
        template.updated_at = now;
        Ok(Some((template, revision)))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

impl TemplateLookup for Database {
    fn find_by_slug(&self, slug: &str) -> Result<Option<Template>> {
        self.get_template_by_slug(slug)
    }
}

fn query_template(conn: &Connection, id: Uuid) -> Result<Option<Template>> {
    let template = conn
        .query_row(
            &format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?"),
            [id.to_string()],
            template_from_row,
        )
        .optional()?;
    Ok(template)
}

fn query_revision(conn: &Connection, id: Uuid) -> Result<Option<TemplateRevision>> {
    let revision = conn
        .query_row(
            &format!("SELECT {REVISION_COLUMNS} FROM template_revisions WHERE id = ?"),
            [id.to_string()],
            revision_from_row,
        )
        .optional()?;
    Ok(revision)
}

fn query_author_by_username(conn: &Connection, username: &str) -> Result<Option<Author>> {
    let author = conn
        .query_row(
            &format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE username = ?"),
            [username],
            author_from_row,
        )
        .optional()?;
    Ok(author)
}

fn ensure_slug_available(conn: &Connection, template: &Template) -> Result<()> {
    let taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM templates WHERE slug = ? AND id != ?",
        (&template.slug, template.id.to_string()),
        |row| row.get(0),
    )?;

    if taken > 0 {
        let mut errors = ValidationErrors::new();
        errors.add("slug", "has already been taken");
        return Err(errors.into());
    }
    Ok(())
}

fn save_template(conn: &Connection, template: &mut Template) -> Result<()> {
    template.normalize();
    template.validate()?;
    ensure_slug_available(conn, template)?;

    template.updated_at = Utc::now();
    conn.execute(
        "UPDATE templates SET name = ?, slug = ?, description = ?, body = ?, file = ?, updated_at = ?
         WHERE id = ?",
        (
            &template.name,
            &template.slug,
            &template.description,
            &template.body,
            &template.file,
            template.updated_at.to_rfc3339(),
            template.id.to_string(),
        ),
    )?;
    Ok(())
}

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<Template> {
    Ok(Template {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        body: row.get(4)?,
        file: row.get(5)?,
        published_revision_id: row.get::<_, Option<String>>(6)?.map(parse_uuid),
        created_at: parse_datetime(row.get::<_, String>(7)?),
        updated_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

fn revision_from_row(row: &Row<'_>) -> rusqlite::Result<TemplateRevision> {
    Ok(TemplateRevision {
        id: parse_uuid(row.get::<_, String>(0)?),
        template_id: parse_uuid(row.get::<_, String>(1)?),
        author_id: parse_uuid(row.get::<_, String>(2)?),
        name: row.get(3)?,
        body: row.get(4)?,
        description: row.get(5)?,
        slug: row.get(6)?,
        is_published: row.get(7)?,
        created_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

fn author_from_row(row: &Row<'_>) -> rusqlite::Result<Author> {
    Ok(Author {
        id: parse_uuid(row.get::<_, String>(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn setup() -> (Database, Author, Template) {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let author = db
            .create_author(CreateAuthorInput {
                username: "editor".to_string(),
                email: "editor@example.com".to_string(),
                ..Default::default()
            })
            .unwrap();
        let template = db
            .create_template(CreateTemplateInput {
                name: "Base".to_string(),
                description: Some("A template".to_string()),
                ..Default::default()
            })
            .unwrap();
        (db, author, template)
    }

    #[test]
    fn publishing_an_invalid_template_writes_nothing() {
        let (db, author, template) = setup();
        db.lock()
            .execute(
                "UPDATE templates SET description = '' WHERE id = ?",
                [template.id.to_string()],
            )
            .unwrap();

        let result = db.publish_template(template.id, author.id);

        assert!(matches!(result, Err(LandableError::Validation(_))));
        assert!(db.get_template_revisions(template.id).unwrap().is_empty());
        let stored = db.get_template(template.id).unwrap().unwrap();
        assert_eq!(stored.published_revision_id, None);
    }

    #[test]
    fn failed_publish_rolls_back_completely() {
        let (db, author, template) = setup();
        let (_, first) = db.publish_template(template.id, author.id).unwrap().unwrap();

        // An unknown author violates the foreign key after the old flag is cleared.
        let result = db.publish_template(template.id, Uuid::new_v4());

        assert!(matches!(result, Err(LandableError::Storage(_))));
        let revisions = db.get_template_revisions(template.id).unwrap();
        assert_eq!(revisions.len(), 1);
        assert!(revisions[0].is_published);
        let stored = db.get_template(template.id).unwrap().unwrap();
        assert_eq!(stored.published_revision_id, Some(first.id));
    }

    #[test]
    fn missing_template_publishes_nothing() {
        let (db, author, _) = setup();
        assert!(db.publish_template(Uuid::new_v4(), author.id).unwrap().is_none());
    }

    #[test]
    fn save_template_rejects_unknown_template() {
        let (db, _, template) = setup();
        let mut ghost = template.clone();
        ghost.id = Uuid::new_v4();
        ghost.slug = Some("ghost".to_string());
        assert!(matches!(
            db.save_template(&mut ghost),
            Err(LandableError::NotFound { .. })
        ));
    }

    #[test]
    fn on_disk_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("landable.db");

        let template_id = {
            let db = Database::open(path.clone()).unwrap();
            db.migrate().unwrap();
            db.create_template(CreateTemplateInput {
                name: "Footer".to_string(),
                description: Some("Site footer".to_string()),
                ..Default::default()
            })
            .unwrap()
            .id
        };

        let db = Database::open(path).unwrap();
        db.migrate().unwrap();
        let stored = db.get_template(template_id).unwrap().unwrap();
        assert_eq!(stored.slug(), Some("footer"));
    }

    #[test]
    fn timestamps_round_trip() {
        let (db, author, _) = setup();
        let expires_at = Utc::now() + Duration::minutes(5);
        let token = db.create_access_token(author.id, expires_at).unwrap();
        let stored = db.get_access_token(author.id, token.id).unwrap().unwrap();
        assert_eq!(stored.expires_at, expires_at);
    }
}
