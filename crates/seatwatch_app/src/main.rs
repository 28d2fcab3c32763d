mod config;
mod logging;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use engine_logging::{engine_error, engine_info, engine_warn};
use seatwatch_core::default_events;
use seatwatch_engine::{
    spawn_polling, DispatchSettings, ExpoPushTransport, NotificationDispatcher, PollingScheduler,
    ReqwestSession, SessionClient,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    if let Err(err) = logging::initialize(config.log_destination) {
        eprintln!("Warning: Could not install logger: {}", err);
    }

    let session = Arc::new(
        ReqwestSession::new(config.session_settings()).context("building provider session")?,
    );
    let transport = Arc::new(
        ExpoPushTransport::new(config.push_settings()).context("building push transport")?,
    );
    let scheduler = Arc::new(PollingScheduler::new(
        default_events(),
        SessionClient::new(session.clone(), config.provider_base.clone()),
        NotificationDispatcher::new(transport, DispatchSettings::default()),
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    engine_info!("Server running on {}; waiting for devices to register", addr);

    let shutdown = CancellationToken::new();
    let server = tokio::spawn({
        let router = routes::router(scheduler.clone());
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        }
    });

    // Polling only starts once the session exists; otherwise checks stay no-ops.
    let poller = match session.establish().await {
        Ok(()) => {
            engine_info!(
                "Checking tickets every {} seconds",
                config.poll_interval.as_secs()
            );
            Some(spawn_polling(
                scheduler.clone(),
                config.poll_interval,
                shutdown.clone(),
            ))
        }
        Err(err) => {
            engine_error!("Provider session failed: {}. Ticket checking disabled.", err);
            None
        }
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        engine_warn!("Could not listen for shutdown signal: {}", err);
    }
    engine_info!("Shutting down");
    shutdown.cancel();

    if let Some(poller) = poller {
        let _ = poller.await;
    }
    server.await.context("server task")?.context("serving http")?;
    Ok(())
}
