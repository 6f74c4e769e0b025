//! Resolves the opaque tenant identity header into a [`TenantId`] extractor.
//!
//! Spec §6: "authentication is by opaque identity header ... resolved upstream to a
//! tenant id placed on the request context. Endpoints reject requests with no tenant."
//! We take that resolution as already done (auth itself is out of scope) and just read
//! the header the upstream proxy is expected to set.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub const TENANT_HEADER: &str = "x-tenant-id";

pub struct TenantId(pub String);

pub struct MissingTenantHeader;

impl IntoResponse for MissingTenantHeader {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, "missing x-tenant-id header").into_response()
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = MissingTenantHeader;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| TenantId(v.to_string()))
            .ok_or(MissingTenantHeader)
    }
}
