//! Per-tenant handle cache with a once-only init gate (spec §4.1).
//!
//! `acquire` is the only way to get a [`TenantHandle`]; the first caller for a given
//! tenant id pays for schema creation and vocabulary seeding, concurrent callers await
//! the same [`OnceCell`] rather than racing to initialize.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard};

use crate::memory::{Embedder, SqliteMemoryStore, StoreError};
use crate::tenant::store::TenantStore;

/// Bundles a tenant's relational store, memory store, and write-serialization lock.
/// Both stores share one SQLite file: their table sets are disjoint, so this avoids
/// a second file handle and keeps the tenant's state in a single unit to back up.
pub struct TenantHandle {
    pub tenant_id: String,
    pub store: TenantStore,
    pub memory: SqliteMemoryStore,
    write_lock: Arc<Mutex<()>>,
}

impl TenantHandle {
    /// Acquires the write-serialization lock. Callers that already hold the guard for
    /// this logical task should thread it down rather than calling this again: a plain
    /// `tokio::sync::Mutex` is not reentrant, so a second call from the same task before
    /// dropping the first guard deadlocks. Orchestrators take the lock once at the top
    /// of a mutating operation and pass the guard to whatever it calls.
    pub async fn write_lock(&self) -> OwnedMutexGuard<()> {
        self.write_lock.clone().lock_owned().await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("store unavailable for tenant {0}: {1}")]
    StoreUnavailable(String, String),
}

/// Creates the per-tenant [`TenantHandle`], including schema and vocabulary seeding.
/// Run once per tenant, guarded by the registry's init gate.
async fn init_handle(
    base_dir: PathBuf,
    tenant_id: String,
    embedder: Option<Arc<dyn Embedder>>,
) -> Result<Arc<TenantHandle>, RegistryError> {
    let db_path = base_dir.join(format!("{tenant_id}.db"));
    let tenant_id_for_store = tenant_id.clone();
    let db_path_for_store = db_path.clone();
    let store = tokio::task::spawn_blocking(move || TenantStore::open(&db_path_for_store))
        .await
        .map_err(|e| RegistryError::StoreUnavailable(tenant_id_for_store.clone(), e.to_string()))?
        .map_err(|e: StoreError| RegistryError::StoreUnavailable(tenant_id_for_store, e.to_string()))?;

    let memory = SqliteMemoryStore::open(&db_path, embedder)
        .map_err(|e| RegistryError::StoreUnavailable(tenant_id.clone(), e.to_string()))?;

    Ok(Arc::new(TenantHandle {
        tenant_id,
        store,
        memory,
        write_lock: Arc::new(Mutex::new(())),
    }))
}

/// Caches one [`TenantHandle`] per tenant id behind a once-only init gate.
pub struct TenantRegistry {
    base_dir: PathBuf,
    embedder: Option<Arc<dyn Embedder>>,
    handles: DashMap<String, Arc<OnceCell<Arc<TenantHandle>>>>,
}

impl TenantRegistry {
    pub fn new(base_dir: impl Into<PathBuf>, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self {
            base_dir: base_dir.into(),
            embedder,
            handles: DashMap::new(),
        }
    }

    /// Returns the tenant's handle, initializing it on first use. Concurrent callers
    /// for the same tenant id share one initialization via the cell's `get_or_try_init`;
    /// a failed initialization is not cached, so the next `acquire` retries it.
    pub async fn acquire(&self, tenant_id: &str) -> Result<Arc<TenantHandle>, RegistryError> {
        let cell = self
            .handles
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let base_dir = self.base_dir.clone();
        let embedder = self.embedder.clone();
        let tenant_id_owned = tenant_id.to_string();
        let result = cell
            .get_or_try_init(|| init_handle(base_dir, tenant_id_owned, embedder))
            .await
            .cloned();

        if result.is_err() {
            // Initialization failed; drop the cell so the next `acquire` retries
            // instead of returning a permanently-cached error.
            self.handles.remove(tenant_id);
        }
        result
    }

    /// Drains all cached handles. Held `Arc<TenantHandle>` clones already in flight
    /// keep their handle alive until their last reference drops.
    pub fn close_all(&self) {
        self.handles.clear();
    }

    pub fn tenant_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fabula-registry-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn acquire_caches_handle_per_tenant() {
        let registry = TenantRegistry::new(temp_dir(), None);
        let h1 = registry.acquire("tenant-a").await.unwrap();
        let h2 = registry.acquire("tenant-a").await.unwrap();
        assert!(Arc::ptr_eq(&h1, &h2));
        assert_eq!(registry.tenant_count(), 1);

        let h3 = registry.acquire("tenant-b").await.unwrap();
        assert!(!Arc::ptr_eq(&h1, &h3));
        assert_eq!(registry.tenant_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_acquire_for_same_tenant_initializes_once() {
        let registry = Arc::new(TenantRegistry::new(temp_dir(), None));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move { registry.acquire("tenant-a").await.unwrap() }));
        }
        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap());
        }
        for pair in results.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }
    }

    #[tokio::test]
    async fn write_lock_serializes_access() {
        let registry = TenantRegistry::new(temp_dir(), None);
        let handle = registry.acquire("tenant-a").await.unwrap();
        let guard = handle.write_lock().await;
        drop(guard);
        let _second = handle.write_lock().await;
    }

    #[tokio::test]
    async fn close_all_clears_cache() {
        let registry = TenantRegistry::new(temp_dir(), None);
        registry.acquire("tenant-a").await.unwrap();
        registry.close_all();
        assert_eq!(registry.tenant_count(), 0);
    }
}
