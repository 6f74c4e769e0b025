use async_trait::async_trait;

use crate::memory::error::StoreError;
use crate::model::{MemoryFragment, MemoryType, ScoredFragment};

/// C3 Memory Service: storage and retrieval of [`MemoryFragment`]s for one project.
///
/// Implementations are scoped per tenant (one SQLite partition per tenant); callers
/// pass `project_id` to further narrow within a tenant's projects.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn put(&self, fragment: MemoryFragment) -> Result<(), StoreError>;

    async fn get(&self, project_id: &str, id: &str) -> Result<Option<MemoryFragment>, StoreError>;

    async fn delete(&self, project_id: &str, id: &str) -> Result<(), StoreError>;

    async fn list(
        &self,
        project_id: &str,
        memory_type: Option<MemoryType>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MemoryFragment>, StoreError>;

    /// Semantic (or, lacking an embedder, lexical) search over a project's fragments.
    async fn search(
        &self,
        project_id: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<ScoredFragment>, StoreError>;

    /// Foreshadow fragments planted (`foreshadow_state == 1`) but not yet resolved,
    /// used by the prompt composer (C7) to remind generation of open threads.
    async fn unresolved_foreshadows(&self, project_id: &str) -> Result<Vec<MemoryFragment>, StoreError>;

    /// Marks a planted foreshadow as resolved by the chapter that paid it off.
    async fn resolve_foreshadow(
        &self,
        project_id: &str,
        fragment_id: &str,
        resolved_by_chapter_id: &str,
    ) -> Result<(), StoreError>;

    /// Batched ingest from the analysis ingestor (§4.3, C9): discards fragments with
    /// empty content, dedups within the batch on `(chapter_id, memory_type, index)`
    /// (`index` being each fragment's position within its `(chapter_id, memory_type)`
    /// group), then replaces any fragments already stored for each chapter touched by
    /// this batch. Re-running analysis for a chapter is therefore idempotent. Returns
    /// the number of fragments actually added. Built on the trait's own primitives so
    /// implementations don't need to override it.
    async fn add_batch(&self, project_id: &str, fragments: Vec<MemoryFragment>) -> Result<usize, StoreError> {
        use std::collections::{HashMap, HashSet};

        let mut per_group_index: HashMap<(Option<String>, MemoryType), i64> = HashMap::new();
        let mut seen = HashSet::new();
        let mut deduped = Vec::new();
        for fragment in fragments {
            if fragment.content.trim().is_empty() {
                continue;
            }
            let group = (fragment.chapter_id.clone(), fragment.memory_type);
            let index = per_group_index.entry(group.clone()).or_insert(0);
            let dedup_key = (group, *index);
            *index += 1;
            if !seen.insert(dedup_key) {
                continue;
            }
            deduped.push(fragment);
        }

        let touched_chapters: HashSet<String> =
            deduped.iter().filter_map(|f| f.chapter_id.clone()).collect();
        for chapter_id in &touched_chapters {
            let existing = self.list(project_id, None, 10_000, 0).await?;
            for fragment in existing.into_iter().filter(|f| f.chapter_id.as_deref() == Some(chapter_id.as_str())) {
                self.delete(project_id, &fragment.id).await?;
            }
        }

        let mut added = 0;
        for fragment in deduped {
            self.put(fragment).await?;
            added += 1;
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMemoryStore;

    fn fragment(chapter_id: &str, memory_type: MemoryType, content: &str) -> MemoryFragment {
        let mut f = MemoryFragment::new(uuid::Uuid::new_v4().to_string(), "p1", memory_type, "title", content);
        f.chapter_id = Some(chapter_id.to_string());
        f
    }

    #[tokio::test]
    async fn add_batch_discards_empty_content_fragments() {
        let store = InMemoryMemoryStore::new();
        let added = store
            .add_batch("p1", vec![fragment("c1", MemoryType::Hook, "   ")])
            .await
            .unwrap();
        assert_eq!(added, 0);
        assert!(store.list("p1", None, 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_batch_replaces_existing_fragments_for_touched_chapters() {
        let store = InMemoryMemoryStore::new();
        store
            .add_batch("p1", vec![fragment("c1", MemoryType::Hook, "first pass")])
            .await
            .unwrap();
        let added = store
            .add_batch("p1", vec![fragment("c1", MemoryType::Hook, "re-analyzed")])
            .await
            .unwrap();
        assert_eq!(added, 1);
        let fragments = store.list("p1", None, 10, 0).await.unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].content, "re-analyzed");
    }

    #[tokio::test]
    async fn add_batch_leaves_other_chapters_untouched() {
        let store = InMemoryMemoryStore::new();
        store
            .add_batch("p1", vec![fragment("c1", MemoryType::Hook, "chapter one hook")])
            .await
            .unwrap();
        store
            .add_batch("p1", vec![fragment("c2", MemoryType::Hook, "chapter two hook")])
            .await
            .unwrap();
        let fragments = store.list("p1", None, 10, 0).await.unwrap();
        assert_eq!(fragments.len(), 2);
    }
}
