//! Ramen Map server.
//!
//! Serves the public map page and JSON API, the places proxy used when
//! registering shops, and the admin dashboard.
//!
//! Migrations are not run on startup; use `ramen-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::borrow::Cow;
use std::net::SocketAddr;

use ramen_map_server::config::ServerConfig;
use ramen_map_server::state::AppState;
use ramen_map_server::{app, db};
use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing::{Level, Metadata};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "ramen_map_server=info,tower_http=debug";

/// Start Sentry when a DSN is configured. The guard flushes on drop.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;

    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: config.sentry_environment.clone().map(Cow::Owned),
        sample_rate: config.sentry_sample_rate,
        traces_sample_rate: config.sentry_traces_sample_rate,
        attach_stacktrace: true,
        ..Default::default()
    };
    Some(sentry::init((dsn, options)))
}

/// Warnings and errors become Sentry events; info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &Metadata<'_>) -> EventFilter {
    let level = *metadata.level();
    if level <= Level::WARN {
        EventFilter::Event
    } else if level <= Level::DEBUG {
        EventFilter::Breadcrumb
    } else {
        EventFilter::Ignore
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Sentry goes first so the tracing layer has a client to report to.
    let sentry_guard = init_sentry(&config);
    init_tracing(config.json_logs);
    if sentry_guard.is_some() {
        tracing::info!("Sentry enabled");
    }

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    let addr = config.socket_addr();
    let router = app(AppState::new(config, pool));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "ramen-map listening");

    // Peer addresses feed the rate limiter when no proxy header is present.
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutting down");
}
