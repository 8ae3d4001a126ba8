//! Validated JSON extractor: deserialization plus `validator` rules in one step.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// JSON body extractor that runs the body's `Validate` rules.
///
/// Malformed JSON and rule violations both surface as `400 Bad Request`.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct CreateCardRequest {
///     #[validate(range(min = 1, max = 10))]
///     status_card: i32,
/// }
///
/// async fn create(ValidatedJson(body): ValidatedJson<CreateCardRequest>) { ... }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        value
            .validate()
            .map_err(|e| AppError::BadRequest(format_validation_errors(&e)))?;

        Ok(Self(value))
    }
}

/// Trim a required text field, rejecting values that are only whitespace.
///
/// # Errors
///
/// `400 Bad Request` naming `field` when nothing is left after trimming.
pub fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_string())
}

/// Flatten validation errors into one sorted, comma-separated message.
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map_or_else(|| format!("{field} is invalid"), ToString::to_string)
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}
