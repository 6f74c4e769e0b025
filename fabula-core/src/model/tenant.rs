use serde::{Deserialize, Serialize};

use super::TimestampMillis;

/// A tenant: the isolation boundary for storage, tool plugins, and concurrency.
/// Each tenant owns one SQLite file under the registry's data directory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub created_at: TimestampMillis,
}
