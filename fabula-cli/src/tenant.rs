//! `fabula tenant`: list provisioned tenants, create one, and list a tenant's
//! projects. Tenants are discovered by scanning `data_dir` for `<tenant_id>.db`
//! files; there is no separate tenant registry table, since the tenant store
//! cache is keyed purely by the data directory (spec §4.1).

use std::path::Path;

use clap::{Args, Subcommand};
use fabula_core::TenantRegistry;

#[derive(Args, Debug)]
pub struct TenantArgs {
    #[command(subcommand)]
    pub cmd: TenantCommand,
}

#[derive(Subcommand, Debug)]
pub enum TenantCommand {
    /// List provisioned tenant ids.
    List,
    /// Create (or confirm) a tenant's storage, seeding schema and vocabulary.
    Create { tenant_id: String },
    /// List a tenant's projects for a given user id.
    Projects { tenant_id: String, user_id: String },
}

pub fn list_tenant_ids(data_dir: &Path) -> std::io::Result<Vec<String>> {
    if !data_dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("db") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
    }
    ids.sort();
    Ok(ids)
}

pub async fn run(cmd: TenantCommand, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        TenantCommand::List => {
            for id in list_tenant_ids(data_dir)? {
                println!("{}", id);
            }
        }
        TenantCommand::Create { tenant_id } => {
            let registry = TenantRegistry::new(data_dir.to_path_buf(), None);
            registry.acquire(&tenant_id).await?;
            println!("tenant {} ready at {}", tenant_id, data_dir.join(format!("{tenant_id}.db")).display());
        }
        TenantCommand::Projects { tenant_id, user_id } => {
            let registry = TenantRegistry::new(data_dir.to_path_buf(), None);
            let handle = registry.acquire(&tenant_id).await?;
            let projects = handle.store.list_projects(&user_id).await?;
            for p in projects {
                println!("{}\t{}", p.id, p.title);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_tenant_ids_returns_empty_for_missing_dir() {
        let dir = std::path::Path::new("/nonexistent/fabula-replay-test-dir");
        assert_eq!(list_tenant_ids(dir).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn list_tenant_ids_picks_up_db_files_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("beta.db"), b"").unwrap();
        std::fs::write(tmp.path().join("alpha.db"), b"").unwrap();
        std::fs::write(tmp.path().join("not-a-db.txt"), b"").unwrap();
        assert_eq!(list_tenant_ids(tmp.path()).unwrap(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        run(TenantCommand::Create { tenant_id: "tenant-a".to_string() }, tmp.path())
            .await
            .unwrap();
        assert_eq!(list_tenant_ids(tmp.path()).unwrap(), vec!["tenant-a"]);
    }
}
