//! Request body extraction that reports problems as validation errors.

use std::sync::LazyLock;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{LandableError, ValidationErrors};

static FIELD_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<kind>missing|unknown) field `(?P<field>[^`]+)`").expect("field pattern is valid")
});

static PATH_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"target type: (?P<field>[A-Za-z_][\w.\[\]]*): ").expect("path pattern is valid")
});

/// `Json<T>` whose rejections answer 422 with an `errors` map instead of
/// axum's plain-text body.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = LandableError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(request, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "rejected request body");
                Err(rejection_errors(&rejection).into())
            }
        }
    }
}

fn rejection_errors(rejection: &JsonRejection) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    match rejection {
        JsonRejection::JsonDataError(_) => {
            let text = rejection.body_text();
            if let Some(caps) = FIELD_ERROR.captures(&text) {
                let message = match &caps["kind"] {
                    "missing" => "can't be blank",
                    _ => "is not a permitted attribute",
                };
                errors.add(&caps["field"], message);
            } else if let Some(caps) = PATH_ERROR.captures(&text) {
                errors.add(&caps["field"], "is invalid");
            } else {
                errors.add("base", "is invalid");
            }
        }
        JsonRejection::JsonSyntaxError(_) => errors.add("base", "is not valid JSON"),
        JsonRejection::MissingJsonContentType(_) => {
            errors.add("base", "must be sent as application/json")
        }
        _ => errors.add("base", "could not be read"),
    }
    errors
}
