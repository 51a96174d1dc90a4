//! initrack - initiative tracker daemon
//!
//! Tracks a single tabletop combat: combatants, initiative order, rounds,
//! turns and monster hit points, persisted to SQLite and served over HTTP.

pub mod api;
pub mod combat;
pub mod config;
pub mod db;
pub mod ddb;
pub mod relay;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{watch, RwLock};
use tracing::info;

pub use config::Config;
use db::Database;
use ddb::DdbClient;
use relay::Relay;
use session::CombatSession;

/// The initrack server instance
pub struct Server {
    config: Config,
    state: api::AppState,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Open the database, restore the session and build the HTTP clients
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::new(config.db_path.as_deref()).await?;
        let session = CombatSession::init(&db).await;
        let ddb = DdbClient::new(
            config.character_service_url.clone(),
            config.relay_origin.clone(),
            config.request_timeout(),
        )?;
        let relay = Relay::new(config.relay_allowed_hosts.clone(), config.request_timeout())?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        if ddb.uses_relay() {
            info!("Character fetches go through relay {:?}", config.relay_origin);
        }

        Ok(Self {
            config,
            state: api::AppState {
                db: Arc::new(db),
                session: Arc::new(RwLock::new(session)),
                ddb: Arc::new(ddb),
                relay: Arc::new(relay),
            },
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Get the database handle
    pub fn db(&self) -> Arc<Database> {
        self.state.db.clone()
    }

    /// Get the shared combat session
    pub fn session(&self) -> Arc<RwLock<CombatSession>> {
        self.state.session.clone()
    }

    /// Build the router
    fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("initrack listening on {}", local_addr);

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        // Last chance to persist anything a failed flush left behind
        self.state.session.write().await.flush(&self.state.db).await;

        info!("initrack shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
