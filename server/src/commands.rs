use clap::Subcommand;
use tracing::info;

use crate::{http_server, AppState, DatabaseConfig, Result};

#[derive(Subcommand, Default)]
pub(crate) enum Command {
    /// Apply pending migrations and serve the API
    #[default]
    Serve,
    /// Apply pending migrations and exit
    Migrate,
}

impl Command {
    pub(crate) async fn run(&self) -> Result<()> {
        match self {
            Command::Serve => serve().await,
            Command::Migrate => migrate().await,
        }
    }
}

async fn serve() -> Result<()> {
    let app_state = AppState::from_env().await?;

    http_server::run_server(app_state).await?;

    info!("Main Returning");

    Ok(())
}

async fn migrate() -> Result<()> {
    let database = DatabaseConfig::from_env()?;

    db::setup_db_pool(&database.url, 1).await?;

    info!("Migrations applied");

    Ok(())
}
