use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::error::parse_id;
use super::extract::ValidatedJson;
use super::middleware::CurrentAuthor;
use super::AppState;
use crate::error::{LandableError, Result};
use crate::models::*;
use crate::render::render_tags;

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Authors
// ============================================================

pub async fn current_author(CurrentAuthor(author): CurrentAuthor) -> Json<Author> {
    Json(author)
}

// ============================================================
// Templates
// ============================================================

pub async fn list_templates(State(state): State<AppState>) -> Result<Json<Vec<Template>>> {
    state.db.get_all_templates().map(Json)
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Template>> {
    let id = parse_id(&id, "template")?;
    state
        .db
        .get_template(id)?
        .map(Json)
        .ok_or_else(|| LandableError::not_found("template", id))
}

pub async fn create_template(
    State(state): State<AppState>,
    CurrentAuthor(author): CurrentAuthor,
    ValidatedJson(input): ValidatedJson<CreateTemplateInput>,
) -> Result<(StatusCode, Json<Template>)> {
    let template = state.db.create_template(input)?;
    tracing::info!(template_id = %template.id, author = %author.username, "template created");
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<UpdateTemplateInput>,
) -> Result<Json<Template>> {
    let id = parse_id(&id, "template")?;
    state
        .db
        .update_template(id, input)?
        .map(Json)
        .ok_or_else(|| LandableError::not_found("template", id))
}

pub async fn publish_template(
    State(state): State<AppState>,
    CurrentAuthor(author): CurrentAuthor,
    Path(id): Path<String>,
) -> Result<Json<PublishedTemplate>> {
    let id = parse_id(&id, "template")?;
    let (template, published_revision) = state.publisher.publish(id, &author)?;
    Ok(Json(PublishedTemplate {
        template,
        published_revision,
    }))
}

// ============================================================
// Template revisions
// ============================================================

pub async fn list_template_revisions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TemplateRevision>>> {
    let id = parse_id(&id, "template")?;
    state
        .db
        .get_template(id)?
        .ok_or_else(|| LandableError::not_found("template", id))?;

    state.db.get_template_revisions(id).map(Json)
}

pub async fn get_template_revision(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TemplateRevision>> {
    let id = parse_id(&id, "template revision")?;
    state
        .db
        .get_revision(id)?
        .map(Json)
        .ok_or_else(|| LandableError::not_found("template revision", id))
}

/// Copy a revision back over its template's working copy.
pub async fn revert_to_revision(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Template>> {
    let id = parse_id(&id, "template revision")?;
    state.publisher.revert_to_revision(id).map(Json)
}

/// Revert a template to one of its own revisions.
pub async fn revert_template(
    State(state): State<AppState>,
    Path((id, revision_id)): Path<(String, String)>,
) -> Result<Json<Template>> {
    let id = parse_id(&id, "template")?;
    let revision_id = parse_id(&revision_id, "template revision")?;
    state.publisher.revert(id, revision_id).map(Json)
}

// ============================================================
// Previews
// ============================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreviewInput {
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Preview {
    pub content: String,
}

/// Expand `{% template %}` tags in a body without saving anything.
pub async fn preview_template(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<PreviewInput>,
) -> Json<Preview> {
    Json(Preview {
        content: render_tags(&input.body, &state.db),
    })
}

// ============================================================
// Themes
// ============================================================

pub async fn list_themes(State(state): State<AppState>) -> Json<Vec<Theme>> {
    Json(state.config.themes.clone())
}
