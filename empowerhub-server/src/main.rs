use std::sync::Arc;

use colored::Colorize;
use empowerhub_core::{DatabaseError, Hub, PgDatabase};
use empowerhub_server::{init_logger, run_server, Config};
use log::{error, info};
use thiserror::Error;

#[derive(Debug, Error)]
enum StartupError {
    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),
}

impl StartupError {
    fn hint(&self) -> String {
        match self {
            StartupError::Database(_) => {
                "Make sure Postgres is running and DATABASE_URL points at it, then try again."
                    .to_string()
            }
        }
    }
}

async fn start(config: Config) -> Result<(), StartupError> {
    info!("Connecting to database...");
    let database = PgDatabase::new(&config.database_url).await?;

    info!("Initialized successfully.");
    let hub = Arc::new(Hub::with_database(database));

    run_server(hub, config).await;

    Ok(())
}

#[tokio::main]
async fn main() {
    init_logger();

    let config = Config::from_env();

    if let Err(error) = start(config).await {
        error!(
            "{} Read the error below to troubleshoot the issue.",
            "Hub failed to start!".bold().red()
        );
        error!("{error}");
        error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
    }
}
