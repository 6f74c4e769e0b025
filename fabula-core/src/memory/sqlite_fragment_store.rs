//! SQLite-backed [`MemoryStore`] with optional semantic search via sqlite-vec.
//!
//! Two tables: `memory_fragments` holds the row data, `memory_fragments_vec` (a vec0
//! virtual table) holds one embedding per fragment, joined by SQLite rowid. When no
//! [`Embedder`] is configured the vec table is not created and `search` falls back
//! to a lexical scan over `content`/`title`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use rusqlite::params;

use crate::memory::embedder::Embedder;
use crate::memory::error::StoreError;
use crate::memory::fragment_store::MemoryStore;
use crate::model::{MemoryFragment, MemoryType, ScoredFragment};

static SQLITE_VEC_INIT: Once = Once::new();

const VEC_TABLE: &str = "memory_fragments_vec";

fn memory_type_str(t: MemoryType) -> &'static str {
    match t {
        MemoryType::ChapterSummary => "chapter_summary",
        MemoryType::Hook => "hook",
        MemoryType::Foreshadow => "foreshadow",
        MemoryType::PlotPoint => "plot_point",
        MemoryType::CharacterEvent => "character_event",
    }
}

fn memory_type_from_str(s: &str) -> Option<MemoryType> {
    match s {
        "chapter_summary" => Some(MemoryType::ChapterSummary),
        "hook" => Some(MemoryType::Hook),
        "foreshadow" => Some(MemoryType::Foreshadow),
        "plot_point" => Some(MemoryType::PlotPoint),
        "character_event" => Some(MemoryType::CharacterEvent),
        _ => None,
    }
}

fn vector_to_json(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|f| f.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn row_to_fragment(row: &rusqlite::Row) -> rusqlite::Result<MemoryFragment> {
    let memory_type_str: String = row.get("memory_type")?;
    let related_characters_json: String = row.get("related_characters")?;
    let tags_json: String = row.get("tags")?;
    Ok(MemoryFragment {
        id: row.get("fragment_id")?,
        project_id: row.get("project_id")?,
        chapter_id: row.get("chapter_id")?,
        memory_type: memory_type_from_str(&memory_type_str).unwrap_or(MemoryType::PlotPoint),
        title: row.get("title")?,
        content: row.get("content")?,
        related_characters: serde_json::from_str(&related_characters_json).unwrap_or_default(),
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        importance_score: row.get("importance_score")?,
        story_timeline: row.get("story_timeline")?,
        foreshadow_state: row.get::<_, i64>("foreshadow_state")? as u8,
        foreshadow_resolved_by: row.get("foreshadow_resolved_by")?,
        chapter_position: row.get("chapter_position")?,
        text_length: row.get("text_length")?,
        created_at: row.get("created_at")?,
    })
}

pub struct SqliteMemoryStore {
    db_path: PathBuf,
    embedder: Option<Arc<dyn Embedder>>,
}

impl SqliteMemoryStore {
    pub fn open(path: impl AsRef<Path>, embedder: Option<Arc<dyn Embedder>>) -> Result<Self, StoreError> {
        if embedder.is_some() {
            SQLITE_VEC_INIT.call_once(|| unsafe {
                rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                    sqlite_vec::sqlite3_vec_init as *const (),
                )));
            });
        }

        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS memory_fragments (
                id INTEGER PRIMARY KEY,
                fragment_id TEXT NOT NULL UNIQUE,
                project_id TEXT NOT NULL,
                chapter_id TEXT,
                memory_type TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                related_characters TEXT NOT NULL DEFAULT '[]',
                tags TEXT NOT NULL DEFAULT '[]',
                importance_score REAL NOT NULL DEFAULT 0.5,
                story_timeline INTEGER NOT NULL DEFAULT 0,
                foreshadow_state INTEGER NOT NULL DEFAULT 0,
                foreshadow_resolved_by TEXT,
                chapter_position INTEGER NOT NULL DEFAULT -1,
                text_length INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
            [],
        )
        .map_err(|e| StoreError::Storage(e.to_string()))?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_memory_fragments_project ON memory_fragments(project_id)",
            [],
        )
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        if let Some(embedder) = &embedder {
            let dimension = embedder.dimension();
            conn.execute(
                &format!("CREATE VIRTUAL TABLE IF NOT EXISTS {VEC_TABLE} USING vec0(embedding float[{dimension}])"),
                [],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        }

        Ok(Self { db_path, embedder })
    }

    fn connect(&self) -> Result<rusqlite::Connection, StoreError> {
        rusqlite::Connection::open(&self.db_path).map_err(|e| StoreError::Storage(e.to_string()))
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn put(&self, fragment: MemoryFragment) -> Result<(), StoreError> {
        let embed_text = fragment.embeddable_text();
        let vector = match &self.embedder {
            Some(embedder) => {
                let vectors = embedder.embed(&[embed_text.as_str()]).await?;
                Some(
                    vectors
                        .into_iter()
                        .next()
                        .ok_or_else(|| StoreError::EmbeddingError("embedder returned no vector".into()))?,
                )
            }
            None => None,
        };

        let db_path = self.db_path.clone();
        let related_characters = serde_json::to_string(&fragment.related_characters)?;
        let tags = serde_json::to_string(&fragment.tags)?;

        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;

            let existing_rowid: Option<i64> = conn
                .query_row(
                    "SELECT id FROM memory_fragments WHERE fragment_id = ?1",
                    params![fragment.id],
                    |row| row.get(0),
                )
                .ok();

            conn.execute(
                r#"
                INSERT INTO memory_fragments
                    (fragment_id, project_id, chapter_id, memory_type, title, content,
                     related_characters, tags, importance_score, story_timeline, foreshadow_state,
                     foreshadow_resolved_by, chapter_position, text_length, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                ON CONFLICT(fragment_id) DO UPDATE SET
                    project_id = excluded.project_id,
                    chapter_id = excluded.chapter_id,
                    memory_type = excluded.memory_type,
                    title = excluded.title,
                    content = excluded.content,
                    related_characters = excluded.related_characters,
                    tags = excluded.tags,
                    importance_score = excluded.importance_score,
                    story_timeline = excluded.story_timeline,
                    foreshadow_state = excluded.foreshadow_state,
                    foreshadow_resolved_by = excluded.foreshadow_resolved_by,
                    chapter_position = excluded.chapter_position,
                    text_length = excluded.text_length
                "#,
                params![
                    fragment.id,
                    fragment.project_id,
                    fragment.chapter_id,
                    memory_type_str(fragment.memory_type),
                    fragment.title,
                    fragment.content,
                    related_characters,
                    tags,
                    fragment.importance_score,
                    fragment.story_timeline,
                    fragment.foreshadow_state as i64,
                    fragment.foreshadow_resolved_by,
                    fragment.chapter_position,
                    fragment.text_length,
                    fragment.created_at,
                ],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;

            if let Some(vector) = vector {
                let rowid: i64 = conn
                    .query_row(
                        "SELECT id FROM memory_fragments WHERE fragment_id = ?1",
                        params![fragment.id],
                        |row| row.get(0),
                    )
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
                if existing_rowid.is_some() {
                    conn.execute(&format!("DELETE FROM {VEC_TABLE} WHERE rowid = ?1"), params![rowid])
                        .map_err(|e| StoreError::Storage(e.to_string()))?;
                }
                conn.execute(
                    &format!("INSERT INTO {VEC_TABLE} (rowid, embedding) VALUES (?1, ?2)"),
                    params![rowid, vector_to_json(&vector)],
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            }

            Ok::<(), StoreError>(())
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn get(&self, project_id: &str, id: &str) -> Result<Option<MemoryFragment>, StoreError> {
        let conn = self.connect()?;
        let project_id = project_id.to_string();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn;
            conn.query_row(
                "SELECT * FROM memory_fragments WHERE fragment_id = ?1 AND project_id = ?2",
                params![id, project_id],
                row_to_fragment,
            )
            .map(Some)
            .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(StoreError::Storage(e.to_string())) })
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn delete(&self, project_id: &str, id: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let project_id = project_id.to_string();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let rowid: Option<i64> = conn
                .query_row(
                    "SELECT id FROM memory_fragments WHERE fragment_id = ?1 AND project_id = ?2",
                    params![id, project_id],
                    |row| row.get(0),
                )
                .ok();
            if let Some(rowid) = rowid {
                conn.execute(&format!("DELETE FROM {VEC_TABLE} WHERE rowid = ?1"), params![rowid]).ok();
                conn.execute("DELETE FROM memory_fragments WHERE id = ?1", params![rowid])
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
            }
            Ok::<(), StoreError>(())
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn list(
        &self,
        project_id: &str,
        memory_type: Option<MemoryType>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MemoryFragment>, StoreError> {
        let db_path = self.db_path.clone();
        let project_id = project_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let (sql, type_filter) = match memory_type {
                Some(t) => (
                    "SELECT * FROM memory_fragments WHERE project_id = ?1 AND memory_type = ?2 ORDER BY created_at LIMIT ?3 OFFSET ?4",
                    Some(memory_type_str(t).to_string()),
                ),
                None => (
                    "SELECT * FROM memory_fragments WHERE project_id = ?1 ORDER BY created_at LIMIT ?3 OFFSET ?4",
                    None,
                ),
            };
            let mut stmt = conn.prepare(sql).map_err(|e| StoreError::Storage(e.to_string()))?;
            let rows = match &type_filter {
                Some(t) => stmt.query_map(params![project_id, t, limit, offset], row_to_fragment),
                None => stmt.query_map(params![project_id, "", limit, offset], row_to_fragment),
            }
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Storage(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn search(&self, project_id: &str, query: &str, limit: u32) -> Result<Vec<ScoredFragment>, StoreError> {
        match &self.embedder {
            Some(embedder) => {
                let vectors = embedder.embed(&[query]).await?;
                let vector = vectors
                    .into_iter()
                    .next()
                    .ok_or_else(|| StoreError::EmbeddingError("embedder returned no vector".into()))?;
                let db_path = self.db_path.clone();
                let project_id = project_id.to_string();
                let vec_json = vector_to_json(&vector);
                tokio::task::spawn_blocking(move || {
                    let conn = rusqlite::Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT rowid, distance FROM {VEC_TABLE} WHERE embedding MATCH ?1 AND k = ?2"
                        ))
                        .map_err(|e| StoreError::Storage(e.to_string()))?;
                    let hits = stmt
                        .query_map(params![vec_json, (limit * 4).max(limit)], |row| {
                            Ok((row.get::<_, i64>(0)?, row.get::<_, f32>(1)?))
                        })
                        .map_err(|e| StoreError::Storage(e.to_string()))?
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| StoreError::Storage(e.to_string()))?;

                    let mut scored = Vec::new();
                    for (rowid, distance) in hits {
                        let fragment: Option<MemoryFragment> = conn
                            .query_row(
                                "SELECT * FROM memory_fragments WHERE id = ?1 AND project_id = ?2",
                                params![rowid, project_id],
                                row_to_fragment,
                            )
                            .ok();
                        if let Some(fragment) = fragment {
                            scored.push(ScoredFragment { fragment, score: 1.0 / (1.0 + distance) });
                        }
                    }
                    scored.truncate(limit as usize);
                    Ok::<Vec<ScoredFragment>, StoreError>(scored)
                })
                .await
                .map_err(|e| StoreError::Storage(e.to_string()))?
            }
            None => {
                let fragments = self.list(project_id, None, 10_000, 0).await?;
                let terms: Vec<String> = query.to_lowercase().split_whitespace().map(String::from).collect();
                let mut scored: Vec<ScoredFragment> = fragments
                    .into_iter()
                    .map(|fragment| {
                        let text = fragment.embeddable_text().to_lowercase();
                        let hits = terms.iter().filter(|t| text.contains(t.as_str())).count();
                        let score = if terms.is_empty() { 0.0 } else { hits as f32 / terms.len() as f32 };
                        ScoredFragment { fragment, score }
                    })
                    .filter(|s| s.score > 0.0)
                    .collect();
                scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
                scored.truncate(limit as usize);
                Ok(scored)
            }
        }
    }

    async fn unresolved_foreshadows(&self, project_id: &str) -> Result<Vec<MemoryFragment>, StoreError> {
        let db_path = self.db_path.clone();
        let project_id = project_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let mut stmt = conn
                .prepare("SELECT * FROM memory_fragments WHERE project_id = ?1 AND foreshadow_state = 1 ORDER BY created_at")
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(params![project_id], row_to_fragment)
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Storage(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn resolve_foreshadow(&self, project_id: &str, fragment_id: &str, resolved_by_chapter_id: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let project_id = project_id.to_string();
        let fragment_id = fragment_id.to_string();
        let resolved_by_chapter_id = resolved_by_chapter_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let changed = conn
                .execute(
                    "UPDATE memory_fragments SET foreshadow_state = 2, foreshadow_resolved_by = ?1 WHERE fragment_id = ?2 AND project_id = ?3",
                    params![resolved_by_chapter_id, fragment_id, project_id],
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            if changed == 0 {
                return Err(StoreError::NotFound(fragment_id));
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> SqliteMemoryStore {
        let path = std::env::temp_dir().join(format!("fabula-memory-test-{}.db", uuid::Uuid::new_v4()));
        SqliteMemoryStore::open(path, None).unwrap()
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let store = temp_store();
        let fragment = MemoryFragment::new("f1", "p1", MemoryType::Hook, "cliffhanger", "the door creaks open");
        store.put(fragment).await.unwrap();
        let found = store.get("p1", "f1").await.unwrap().unwrap();
        assert_eq!(found.title, "cliffhanger");
    }

    #[tokio::test]
    async fn list_filters_by_memory_type() {
        let store = temp_store();
        store.put(MemoryFragment::new("f1", "p1", MemoryType::Hook, "h", "x")).await.unwrap();
        store.put(MemoryFragment::new("f2", "p1", MemoryType::PlotPoint, "p", "y")).await.unwrap();
        let hooks = store.list("p1", Some(MemoryType::Hook), 50, 0).await.unwrap();
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].id, "f1");
    }

    #[tokio::test]
    async fn lexical_search_without_embedder() {
        let store = temp_store();
        store
            .put(MemoryFragment::new("f1", "p1", MemoryType::PlotPoint, "castle siege", "the castle falls at dawn"))
            .await
            .unwrap();
        let hits = store.search("p1", "castle", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn tags_round_trip_through_storage() {
        let store = temp_store();
        let mut fragment = MemoryFragment::new("f1", "p1", MemoryType::Hook, "cliffhanger", "the door creaks open");
        fragment.tags = vec!["hook".to_string(), "suspense".to_string()];
        store.put(fragment).await.unwrap();
        let found = store.get("p1", "f1").await.unwrap().unwrap();
        assert_eq!(found.tags, vec!["hook".to_string(), "suspense".to_string()]);
    }

    #[tokio::test]
    async fn resolve_foreshadow_marks_resolved() {
        let store = temp_store();
        let mut fragment = MemoryFragment::new("f1", "p1", MemoryType::Foreshadow, "the key", "a rusted key");
        fragment.foreshadow_state = 1;
        store.put(fragment).await.unwrap();
        store.resolve_foreshadow("p1", "f1", "chapter-2").await.unwrap();
        assert!(store.unresolved_foreshadows("p1").await.unwrap().is_empty());
    }
}
