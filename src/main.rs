use std::time::Duration;

use actix_web::{web, App, HttpServer};
use lms_portal::{routes, Database, PortalConfig};

fn spawn_session_sweeper(db: Database, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match db.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!("Purged {} expired sessions", purged),
                Err(e) => tracing::warn!("Session sweep failed: {}", e),
            }
        }
    });
}

async fn start_api(db: Database, config: PortalConfig) -> std::io::Result<()> {
    let bind = config.bind_address();
    let db_data = web::Data::new(db);
    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = PortalConfig::load()?;
    tracing::info!("Opening database at {}", config.database_url);
    let db = Database::connect(&config.database_url).await?;

    if let Some(seed) = &config.seed_admin {
        if db.ensure_admin(&seed.username, &seed.password).await? {
            tracing::info!("Created admin account {}", seed.username);
        }
    }

    if config.sweep_interval_secs > 0 {
        spawn_session_sweeper(db.clone(), Duration::from_secs(config.sweep_interval_secs));
    }

    tracing::info!(
        "Starting LMS portal on http://{}:{}",
        config.host,
        config.port
    );
    start_api(db, config).await?;

    Ok(())
}
