//! Request guards: access-token authentication and media negotiation.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{
        header::{ACCEPT, AUTHORIZATION},
        request::Parts,
        HeaderValue, Request,
    },
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use super::AppState;
use crate::auth;
use crate::error::LandableError;
use crate::media::{ApiMedia, MediaFormat};
use crate::models::Author;

/// Response header echoing the negotiated media type.
pub const MEDIA_TYPE_HEADER: &str = "x-landable-media-type";

/// The author bound to the request by [`require_author`].
///
/// Use this as an extractor in any handler that needs to know who is acting.
#[derive(Debug, Clone)]
pub struct CurrentAuthor(pub Author);

impl<S> FromRequestParts<S> for CurrentAuthor
where
    S: Send + Sync,
{
    type Rejection = LandableError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentAuthor>()
            .cloned()
            .ok_or(LandableError::Authentication)
    }
}

/// Reject the request unless it carries a valid, unexpired access token.
pub async fn require_author(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, LandableError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let author = auth::authenticate(&state.db, header, Utc::now())?;
    request.extensions_mut().insert(CurrentAuthor(author));

    Ok(next.run(request).await)
}

/// Work out the requested representation and refuse anything but JSON.
/// JSON anywhere in the Accept header is enough.
///
/// The negotiated [`ApiMedia`] is available to handlers as a request
/// extension and echoed back in the `X-Landable-Media-Type` header.
pub async fn negotiate_media(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, LandableError> {
    let accept = request.headers().get(ACCEPT).and_then(|h| h.to_str().ok());
    let media =
        ApiMedia::negotiate_preferring(accept, &state.config.media_namespace, MediaFormat::Json);

    if media.format != MediaFormat::Json {
        return Err(LandableError::UnsupportedRepresentation(
            media.format.to_string(),
        ));
    }

    let label = state
        .config
        .media_type_label(media.version, media.format.as_str());
    request.extensions_mut().insert(media);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&label) {
        response.headers_mut().insert(MEDIA_TYPE_HEADER, value);
    }

    Ok(response)
}
