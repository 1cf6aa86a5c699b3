use std::env::var;
use std::time::Duration;

use dotenv::dotenv;
use log::{error, info};
use ticket_db::{Database, DatabaseConfig};

const DAEMON_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Rebuilds every view once. A failing view is logged and the others are still refreshed.
async fn refresh_all(db: &Database) {
    for view in db.views() {
        info!("Refreshing {}", view.name());
        match db.refresh_view(view).await {
            Ok(()) => info!("Refreshed {}", view.name()),
            Err(e) => error!("Failed to refresh {}: {e}", view.name()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DatabaseConfig::from_env()?;
    let db = Database::connect(config).await?;
    info!("Connected to database");

    if var("DAEMON").is_ok_and(|daemon| daemon == "true") {
        loop {
            refresh_all(&db).await;
            tokio::time::sleep(DAEMON_INTERVAL).await;
        }
    }

    refresh_all(&db).await;
    Ok(())
}
