//! In-memory [`MemoryStore`]: no embedder, no persistence. Used in tests and as the
//! degrade path when a tenant has no vector search backend configured.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::memory::error::StoreError;
use crate::memory::fragment_store::MemoryStore;
use crate::model::{MemoryFragment, MemoryType, ScoredFragment};

#[derive(Default)]
pub struct InMemoryMemoryStore {
    fragments: RwLock<HashMap<String, MemoryFragment>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crude term-overlap score between a query and a fragment's embeddable text.
    /// Good enough for tests and for tenants running without an embedder; not a
    /// substitute for real semantic search.
    fn lexical_score(query: &str, text: &str) -> f32 {
        let query_terms: Vec<String> = query.to_lowercase().split_whitespace().map(String::from).collect();
        if query_terms.is_empty() {
            return 0.0;
        }
        let text_lower = text.to_lowercase();
        let hits = query_terms.iter().filter(|t| text_lower.contains(t.as_str())).count();
        hits as f32 / query_terms.len() as f32
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn put(&self, fragment: MemoryFragment) -> Result<(), StoreError> {
        self.fragments.write().await.insert(fragment.id.clone(), fragment);
        Ok(())
    }

    async fn get(&self, project_id: &str, id: &str) -> Result<Option<MemoryFragment>, StoreError> {
        let fragments = self.fragments.read().await;
        Ok(fragments
            .get(id)
            .filter(|f| f.project_id == project_id)
            .cloned())
    }

    async fn delete(&self, project_id: &str, id: &str) -> Result<(), StoreError> {
        let mut fragments = self.fragments.write().await;
        if fragments.get(id).is_some_and(|f| f.project_id == project_id) {
            fragments.remove(id);
        }
        Ok(())
    }

    async fn list(
        &self,
        project_id: &str,
        memory_type: Option<MemoryType>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MemoryFragment>, StoreError> {
        let fragments = self.fragments.read().await;
        let mut matched: Vec<MemoryFragment> = fragments
            .values()
            .filter(|f| f.project_id == project_id)
            .filter(|f| memory_type.is_none_or(|t| f.memory_type == t))
            .cloned()
            .collect();
        matched.sort_by_key(|f| f.created_at);
        Ok(matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn search(
        &self,
        project_id: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<ScoredFragment>, StoreError> {
        let fragments = self.fragments.read().await;
        let mut scored: Vec<ScoredFragment> = fragments
            .values()
            .filter(|f| f.project_id == project_id)
            .map(|f| ScoredFragment {
                score: Self::lexical_score(query, &f.embeddable_text()),
                fragment: f.clone(),
            })
            .filter(|s| s.score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit as usize);
        Ok(scored)
    }

    async fn unresolved_foreshadows(&self, project_id: &str) -> Result<Vec<MemoryFragment>, StoreError> {
        let fragments = self.fragments.read().await;
        Ok(fragments
            .values()
            .filter(|f| f.project_id == project_id && f.foreshadow_state == 1)
            .cloned()
            .collect())
    }

    async fn resolve_foreshadow(
        &self,
        project_id: &str,
        fragment_id: &str,
        resolved_by_chapter_id: &str,
    ) -> Result<(), StoreError> {
        let mut fragments = self.fragments.write().await;
        let fragment = fragments
            .get_mut(fragment_id)
            .filter(|f| f.project_id == project_id)
            .ok_or_else(|| StoreError::NotFound(fragment_id.to_string()))?;
        fragment.foreshadow_state = 2;
        fragment.foreshadow_resolved_by = Some(resolved_by_chapter_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(id: &str, project: &str, kind: MemoryType, title: &str) -> MemoryFragment {
        MemoryFragment::new(id, project, kind, title, "body text about a castle")
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let store = InMemoryMemoryStore::new();
        store.put(fragment("f1", "p1", MemoryType::Hook, "opening hook")).await.unwrap();
        let found = store.get("p1", "f1").await.unwrap();
        assert_eq!(found.unwrap().title, "opening hook");
    }

    #[tokio::test]
    async fn get_wrong_project_is_none() {
        let store = InMemoryMemoryStore::new();
        store.put(fragment("f1", "p1", MemoryType::Hook, "opening hook")).await.unwrap();
        assert!(store.get("other-project", "f1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_ranks_by_term_overlap() {
        let store = InMemoryMemoryStore::new();
        store.put(MemoryFragment::new("f1", "p1", MemoryType::PlotPoint, "castle siege", "the castle falls at dawn")).await.unwrap();
        store.put(MemoryFragment::new("f2", "p1", MemoryType::PlotPoint, "tavern brawl", "a brawl breaks out")).await.unwrap();
        let hits = store.search("p1", "castle dawn", 10).await.unwrap();
        assert_eq!(hits[0].fragment.id, "f1");
    }

    #[tokio::test]
    async fn resolve_foreshadow_updates_state() {
        let store = InMemoryMemoryStore::new();
        let mut f = fragment("f1", "p1", MemoryType::Foreshadow, "the locked door");
        f.foreshadow_state = 1;
        store.put(f).await.unwrap();
        store.resolve_foreshadow("p1", "f1", "chapter-3").await.unwrap();
        let resolved = store.get("p1", "f1").await.unwrap().unwrap();
        assert_eq!(resolved.foreshadow_state, 2);
        assert_eq!(resolved.foreshadow_resolved_by.as_deref(), Some("chapter-3"));
        assert!(store.unresolved_foreshadows("p1").await.unwrap().is_empty());
    }
}
