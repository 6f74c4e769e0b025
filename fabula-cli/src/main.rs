//! Admin CLI for the fabula orchestration engine.
//!
//! Subcommands: `tenant` (provisioning/inspection), `replay` (dry-run a
//! generation against a mock LLM), `config` (resolved operator config),
//! `serve` (run the HTTP+SSE server in-process).

mod config_cmd;
mod log_format;
mod logging;
mod replay;
mod tenant;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use replay::ReplayArgs;
use tenant::TenantArgs;

#[derive(Parser, Debug)]
#[command(name = "fabula")]
#[command(about = "Admin CLI for the fabula multi-tenant fiction-authoring backend")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// Per-tenant SQLite data directory (default: $FABULA_DATA_DIR or ./fabula-data)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tenant provisioning and inspection.
    Tenant(TenantArgs),
    /// Replay the chapter-generate orchestrator against a mock LLM.
    Replay(ReplayArgs),
    /// Show resolved operator configuration.
    Config,
    /// Run the HTTP+SSE server in-process.
    Serve {
        #[arg(long, value_name = "ADDR")]
        addr: Option<String>,
    },
}

fn resolve_data_dir(cli: &Cli) -> PathBuf {
    cli.data_dir.clone().unwrap_or_else(|| {
        std::env::var("FABULA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./fabula-data"))
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fabula_config::load_and_apply("fabula", None).ok();
    logging::init()?;

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(&cli);

    match cli.cmd {
        Command::Tenant(args) => tenant::run(args.cmd, &data_dir).await?,
        Command::Replay(args) => replay::run(args, &data_dir).await?,
        Command::Config => config_cmd::run()?,
        Command::Serve { addr } => fabula_server::run_server(addr.as_deref()).await?,
    }

    Ok(())
}
