pub mod jwt;
pub mod middleware;
pub mod password;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

/// Extract the raw token from an `Authorization: Bearer <token>` header.
///
/// Returns `None` when the header is absent or not valid UTF-8, and
/// `Some(Err(()))` when it is present but not a bearer credential.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<Result<&str, ()>> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    Some(
        value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(()),
    )
}
