//! Access-token authentication.
//!
//! Requests carry `Authorization: Basic base64(username:token_id)`. The
//! username must name an existing author, the token id must be one of that
//! author's tokens, and the token must not have expired. Every failure looks
//! the same to the client: [`LandableError::Authentication`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{LandableError, Result};
use crate::models::Author;

/// Why a credential was refused. Only ever logged, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingHeader,
    MalformedHeader,
    UnknownAuthor,
    UnknownToken,
    ExpiredToken,
}

/// Username and token id decoded from a basic-auth header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token_id: String,
}

impl Credentials {
    pub fn parse(header: Option<&str>) -> std::result::Result<Self, Rejection> {
        let header = header.ok_or(Rejection::MissingHeader)?.trim();
        let (scheme, encoded) = header
            .split_once(char::is_whitespace)
            .ok_or(Rejection::MalformedHeader)?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(Rejection::MalformedHeader);
        }
        let encoded = encoded.trim();
        let decoded = STANDARD
            .decode(encoded)
            .map_err(|_| Rejection::MalformedHeader)?;
        let decoded = String::from_utf8(decoded).map_err(|_| Rejection::MalformedHeader)?;
        let (username, token_id) = decoded.split_once(':').ok_or(Rejection::MalformedHeader)?;

        Ok(Self {
            username: username.to_string(),
            token_id: token_id.to_string(),
        })
    }

    /// Encode as an `Authorization` header value.
    pub fn header_value(username: &str, token_id: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{username}:{token_id}")))
    }
}

/// Resolve the author behind an `Authorization` header as of `now`.
pub fn authenticate(db: &Database, header: Option<&str>, now: DateTime<Utc>) -> Result<Author> {
    match resolve(db, header, now)? {
        Ok(author) => {
            tracing::debug!(author = %author.username, "authenticated request");
            Ok(author)
        }
        Err(rejection) => {
            tracing::debug!(?rejection, "rejected credentials");
            Err(LandableError::Authentication)
        }
    }
}

/// Storage failures propagate as errors; credential problems come back as a
/// [`Rejection`].
fn resolve(
    db: &Database,
    header: Option<&str>,
    now: DateTime<Utc>,
) -> Result<std::result::Result<Author, Rejection>> {
    let credentials = match Credentials::parse(header) {
        Ok(credentials) => credentials,
        Err(rejection) => return Ok(Err(rejection)),
    };

    let Some(author) = db.get_author_by_username(&credentials.username)? else {
        return Ok(Err(Rejection::UnknownAuthor));
    };

    let Ok(token_id) = Uuid::parse_str(&credentials.token_id) else {
        return Ok(Err(Rejection::UnknownToken));
    };

    let Some(token) = db.get_access_token(author.id, token_id)? else {
        return Ok(Err(Rejection::UnknownToken));
    };

    if token.is_expired_at(now) {
        return Ok(Err(Rejection::ExpiredToken));
    }

    Ok(Ok(author))
}
