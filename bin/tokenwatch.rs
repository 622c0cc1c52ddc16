use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use tokenwatch::{api, AppState, CronScheduler, HttpMarketFeed, Settings, Sweeper};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .context("Failed to initialize logger")?;

    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    if settings.tokens.is_empty() {
        warn!("No tokens configured, sweeps will produce empty views");
    }

    let cancellation_token = CancellationToken::new();

    run_service(settings, cancellation_token).await
}

async fn run_service(
    settings: Settings,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let state = AppState::new();

    let feed = HttpMarketFeed::new(&settings.sources, &settings.sweep)
        .context("Failed to build market data clients")?;

    let sweeper = Arc::new(Sweeper::new(
        Arc::new(feed),
        state.clone(),
        settings.tokens.clone(),
        settings.sweep.clone(),
    ));

    let cron_scheduler = CronScheduler::new(sweeper, settings.sweep.interval());

    let cron_token = cancellation_token.child_token();
    let cron_handle = tokio::spawn(async move {
        if let Err(e) = cron_scheduler.run(cron_token).await {
            error!("Cron scheduler failed: {:#}", e);
        }
    });

    info!(
        "Cron scheduler started - sweeping {} tokens every {}s",
        settings.tokens.len(),
        settings.sweep.interval_secs
    );

    let address = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    let server_token = cancellation_token.child_token();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, api::router(state))
            .with_graceful_shutdown(server_token.cancelled_owned())
            .await
        {
            error!("HTTP server failed: {:#}", e);
        }
    });

    info!("Listening on {}", address);

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Service running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    info!("Finishing all tasks...");

    cancellation_token.cancel();

    info!("Waiting for cron scheduler to stop...");
    let _ = cron_handle.await;

    info!("Waiting for HTTP server to stop...");
    let _ = server_handle.await;

    info!("All tasks stopped");
    Ok(())
}
