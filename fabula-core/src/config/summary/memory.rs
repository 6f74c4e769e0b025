//! Memory config block for run config summary.
//!
//! Implements [`ConfigSection`](super::ConfigSection). Used by the CLI to build
//! the "Memory config" line for a tenant's SQLite partition.

use super::ConfigSection;

/// Memory configuration summary for one tenant's partition.
pub struct MemoryConfigSummary {
    pub db_path: String,
    pub semantic_search: bool,
    pub fragment_count: Option<u64>,
}

impl ConfigSection for MemoryConfigSummary {
    fn section_name(&self) -> &str {
        "Memory config"
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![
            ("db_path", self.db_path.clone()),
            ("semantic_search", self.semantic_search.to_string()),
        ];
        if let Some(count) = self.fragment_count {
            out.push(("fragment_count", count.to_string()));
        }
        out
    }
}
