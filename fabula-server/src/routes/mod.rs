//! One module per resource family; handlers take `State<Arc<AppState>>` plus a
//! [`crate::tenant_id::TenantId`] extractor and call straight into `fabula_core`.

pub mod analysis;
pub mod chapters;
pub mod entities;
pub mod memory;
pub mod outlines;
pub mod plugins;
pub mod projects;
pub mod styles;
pub mod wizard;

use std::sync::Arc;

use fabula_core::{OrchestratorError, TenantHandle};

use crate::app::AppState;
use crate::error::ApiError;

/// Acquires the caller's tenant handle, wrapping registry failures as `ApiError`.
/// Every non-streaming handler starts here; streaming handlers let the orchestrator
/// acquire its own handle since that failure needs to become an SSE `error` event.
pub(crate) async fn acquire(state: &AppState, tenant_id: &str) -> Result<Arc<TenantHandle>, ApiError> {
    state
        .ctx
        .registry
        .acquire(tenant_id)
        .await
        .map_err(|e| ApiError(OrchestratorError::Internal(e.to_string())))
}
