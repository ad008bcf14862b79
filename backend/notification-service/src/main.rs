use notification_service::{config::LogFormat, Config, PushCredentials};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,push_credentials=debug".into());
    match config.app.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    tracing::info!(env = %config.app.env, "Starting notification service credential refresh");

    let credentials = PushCredentials::start(&config).await?;
    tracing::info!("Push credentials ready");

    tokio::select! {
        stopped = credentials.first_stop() => {
            credentials.shutdown().await;
            match stopped {
                Some(err) => {
                    tracing::error!(error = %err, "Push credential renewal exhausted, exiting");
                    Err(err.into())
                }
                None => anyhow::bail!("push credential refresh stopped unexpectedly"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            credentials.shutdown().await;
            Ok(())
        }
    }
}
