mod error;
mod extract;
mod handlers;
pub mod middleware;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use error::parse_id;
pub use extract::ValidatedJson;
pub use handlers::{Preview, PreviewInput};

use crate::config::LandableConfig;
use crate::db::Database;
use crate::publishing::{LogPublishObserver, PublishObserver, Publisher};

/// Shared state available to every handler via `State<AppState>`.
///
/// Cheap to clone: the database handle and configuration sit behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<LandableConfig>,
    pub publisher: Publisher,
}

impl AppState {
    pub fn new(db: Database, config: LandableConfig) -> Self {
        Self::with_observer(db, config, Arc::new(LogPublishObserver))
    }

    pub fn with_observer(
        db: Database,
        config: LandableConfig,
        observer: Arc<dyn PublishObserver>,
    ) -> Self {
        Self {
            publisher: Publisher::new(db.clone(), observer),
            db,
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Authors
        .route("/authors/current", get(handlers::current_author))
        // Templates
        .route("/templates", get(handlers::list_templates))
        .route("/templates", post(handlers::create_template))
        .route("/templates/{id}", get(handlers::get_template))
        .route("/templates/{id}", put(handlers::update_template))
        .route("/templates/{id}", patch(handlers::update_template))
        .route("/templates/{id}/publish", post(handlers::publish_template))
        .route("/templates/{id}/revisions", get(handlers::list_template_revisions))
        .route(
            "/templates/{id}/revert_to/{revision_id}",
            post(handlers::revert_template),
        )
        // Template revisions
        .route("/template_revisions/{id}", get(handlers::get_template_revision))
        .route(
            "/template_revisions/{id}/revert_to",
            post(handlers::revert_to_revision),
        )
        // Previews
        .route("/template_previews", post(handlers::preview_template))
        // Themes
        .route("/themes", get(handlers::list_themes))
        // Authentication runs first, then negotiation.
        .route_layer(from_fn_with_state(state.clone(), middleware::negotiate_media))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_author));

    let router = Router::new().route("/health", get(handlers::health));
    let router = match state.config.api_namespace.as_str() {
        "/" | "" => router.merge(api),
        namespace => router.nest(namespace, api),
    };

    let router = router.layer(TraceLayer::new_for_http());
    let router = match &state.config.cors_origins {
        Some(origins) => router.layer(cors_layer(origins)),
        None => router,
    };

    router.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::any())
        .allow_credentials(false)
        .max_age(Duration::from_secs(15 * 60))
}
