use std::sync::Arc;

use tokio::sync::mpsc;

use campus_api::assets::S3Assets;
use campus_api::mailer::transport::HttpMailer;
use campus_api::mailer::{process_batch, ChangeRecord};
use campus_api::state::AppState;
use campus_api::{config, db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_api=info,tower_http=info".into()),
        )
        .init();

    let config = config::config();
    tracing::info!(environment = ?config.environment, "starting campus-api");

    let pool = db::connect().await?;
    let assets = Arc::new(S3Assets::from_env().await);

    let (mail_tx, mut mail_rx) = mpsc::channel::<ChangeRecord>(256);

    // Background email worker: drain queued change records and dispatch
    // through the HTTP mail gateway. One record per batch keeps latency low;
    // failures are logged per record and never crash the task.
    tokio::spawn(async move {
        let transport = HttpMailer::new();
        while let Some(record) = mail_rx.recv().await {
            let summary = process_batch(&[record], &transport).await;
            if summary.processed < summary.received {
                tracing::warn!(
                    received = summary.received,
                    processed = summary.processed,
                    "email batch had failures"
                );
            }
        }
    });

    let state = AppState::new(pool, mail_tx, assets);
    let app = routes::app(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
