//! JSON response unwrapping
//!
//! Every IdP endpoint answers with `application/json`. Rules:
//! 1. Content-Type not `application/json` → `UnexpectedContentType`
//! 2. Status listed in `absent_on` → `Ok(None)` (a recognized, non-fatal outcome)
//! 3. Any other non-2xx status → `Api { status }`
//! 4. 2xx with `Content-Length: 0` → `Ok(None)` (no data)
//! 5. Otherwise the body is parsed into `T`

use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};

/// Unwrap a JSON response into `T`, mapping the statuses in `absent_on` to `None`.
pub async fn json_api<T: DeserializeOwned>(
    response: reqwest::Response,
    absent_on: &[StatusCode],
) -> Result<Option<T>> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("application/json") {
        return Err(Error::UnexpectedContentType(content_type));
    }

    if absent_on.contains(&status) {
        debug!(%status, "handled status, no data");
        return Ok(None);
    }
    if !status.is_success() {
        debug!(%status, "handler missing");
        return Err(Error::Api {
            status: status.as_u16(),
        });
    }

    let empty = response
        .headers()
        .get(CONTENT_LENGTH)
        .is_some_and(|v| v.as_bytes() == b"0");
    if empty {
        debug!(%status, "empty body, no data");
        return Ok(None);
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Http(format!("reading response body: {e}")))?;
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| Error::InvalidResponse(e.to_string()))
}
