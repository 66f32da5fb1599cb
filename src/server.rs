use axum::{
    routing::{delete, get},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::api::{self, AppState};
use crate::database::Database;
use crate::error::CarpoolError;

pub struct WebServer {
    host: String,
    port: u16,
    db: Database,
}

impl WebServer {
    pub fn new(host: String, port: u16, db: Database) -> Self {
        Self { host, port, db }
    }

    pub async fn start(&self) -> Result<(), CarpoolError> {
        let app = create_router(AppState::new(self.db.clone()));

        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| CarpoolError::Error(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CarpoolError::Error(format!("Failed to bind to {}: {}", addr, e)))?;

        println!("Carpool server listening on http://{}", addr);
        log::info!("Server ready to handle requests on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_signal().await;
                log::info!("Shutdown signal received, stopping server");
                println!("\nShutdown signal received - stopping server gracefully...");
            })
            .await
            .map_err(|e| CarpoolError::Error(format!("Server error: {}", e)))?;

        log::info!("Server shutdown complete");
        Ok(())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Service info
        .route("/", get(api::app::get_app_info))
        .route("/health", get(api::app::health_check))
        // Group endpoints
        .route(
            "/groups",
            get(api::groups::list_groups).post(api::groups::create_group),
        )
        .route(
            "/groups/{name}",
            get(api::groups::get_group).delete(api::groups::delete_group),
        )
        // Schedule endpoints
        .route(
            "/groups/{name}/schedule",
            get(api::schedules::get_schedule).post(api::schedules::generate_schedule),
        )
        // On-demand endpoints
        .route(
            "/on_demand/requests",
            get(api::on_demand::list_requests).post(api::on_demand::create_request),
        )
        .route(
            "/on_demand/requests/{id}",
            delete(api::on_demand::delete_request),
        )
        .route("/on_demand/drivers", get(api::on_demand::list_drivers))
        .with_state(state)
}

/// Waits for a shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received SIGINT (Ctrl+C)");
        },
        _ = terminate => {
            log::info!("Received SIGTERM");
        },
    }
}
