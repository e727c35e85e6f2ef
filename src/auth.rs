use axum::http::HeaderMap;

use crate::error::ApiError;

pub const EXTENSION_KEY_HEADER: &str = "x-extension-key";

/// Checks the shared-secret header. Exact match only: no trimming, no case
/// folding.
pub fn ensure_authorized(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let provided = headers
        .get(EXTENSION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    if provided != expected {
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}
