//! # Memory: C3 Memory Service
//!
//! Storage and retrieval of [`MemoryFragment`]s: per-chapter summaries, planted
//! hooks, foreshadow plants/payoffs, and character development beats, scoped to a
//! tenant's project. Used by the prompt composer (C7) to build generation context
//! and by the analysis ingestor (C9) to persist what a chapter introduced.
//!
//! ## Implementations
//!
//! | Type                    | Persistence | Search                          |
//! |--------------------------|-------------|----------------------------------|
//! | [`InMemoryMemoryStore`]   | In-memory   | Lexical (term overlap)          |
//! | [`SqliteMemoryStore`]     | SQLite file | Semantic (sqlite-vec) or lexical |
//!
//! `SqliteMemoryStore` embeds fragment text via an [`Embedder`] when one is
//! configured; without one it degrades to the same lexical scan `InMemoryMemoryStore`
//! uses, so a tenant without an embedding provider still gets working recall.

mod context;
mod embedder;
mod error;
mod fragment_store;
mod in_memory_fragment_store;
mod openai_embedder;
mod sqlite_fragment_store;

pub use context::{build_context, ContextSlice, MemoryContextBundle, DEFAULT_RECENT_CHAPTERS, DEFAULT_TOP_K};
pub use embedder::Embedder;
pub use error::StoreError;
pub use fragment_store::MemoryStore;
pub use in_memory_fragment_store::InMemoryMemoryStore;
pub use openai_embedder::OpenAIEmbedder;
pub use sqlite_fragment_store::SqliteMemoryStore;
