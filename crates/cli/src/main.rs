use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use catalog_app::{Catalog, Frontends};
use catalog_kernel::settings::Settings;

/// Book catalog: REST and tool-invocation servers over one SQLite store.
#[derive(Debug, Parser)]
#[command(name = "catalog", version, about)]
struct Cli {
    /// Directory holding `base.toml` and `<environment>.toml`
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the REST and tool servers
    Serve,
    /// Run the REST server only
    Api,
    /// Run the tool server only
    Mcp,
    /// Apply pending migrations and exit
    Migrate,
    /// Print the tool capability table
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(cli.config_dir.as_deref())
        .context("failed to load catalog settings")?;
    catalog_telemetry::init(&settings.telemetry).context("failed to install telemetry")?;

    match cli.command {
        Command::Serve => catalog_app::run(settings, Frontends::Both).await,
        Command::Api => catalog_app::run(settings, Frontends::Api).await,
        Command::Mcp => catalog_app::run(settings, Frontends::Mcp).await,
        Command::Migrate => migrate(settings).await,
        Command::Tools => {
            print_tools(&settings);
            Ok(())
        }
    }
}

async fn migrate(settings: Settings) -> anyhow::Result<()> {
    let catalog = Catalog::connect(settings).await?;
    let applied = catalog.migrate().await?;
    catalog.shutdown().await?;

    println!("applied {applied} migration(s)");
    Ok(())
}

fn print_tools(settings: &Settings) {
    let endpoints = &settings.mcp.endpoints;
    if endpoints.is_empty() {
        println!("no tools configured");
        return;
    }

    let width = endpoints
        .iter()
        .map(|endpoint| endpoint.name.len())
        .max()
        .unwrap_or(0);
    for endpoint in endpoints {
        let state = if endpoint.enabled { "enabled" } else { "disabled" };
        println!(
            "{:<width$}  {:<8}  {}",
            endpoint.name, state, endpoint.description
        );
    }
}
