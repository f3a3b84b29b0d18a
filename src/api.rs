use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::store::SnapshotStore;

async fn all_metrics(State(store): State<Arc<SnapshotStore>>) -> Response {
    (axum::http::StatusCode::OK, Json(store.all())).into_response()
}

async fn instance_metrics(
    State(store): State<Arc<SnapshotStore>>,
    Path(instance): Path<String>,
) -> Response {
    let groups = store.instance(&instance);
    if groups.is_empty() {
        return (
            axum::http::StatusCode::NOT_FOUND,
            format!("no metrics for instance `{instance}`"),
        )
            .into_response();
    }
    (axum::http::StatusCode::OK, Json(groups)).into_response()
}

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        let router = axum::Router::new()
            .route("/metrics", get(all_metrics))
            .route("/metrics/{instance}", get(instance_metrics))
            .with_state(store);
        Self { router }
    }

    pub fn router(&self) -> axum::Router {
        self.router.clone()
    }

    /// Binds `addr` and serves until the server fails.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if binding or serving fails.
    pub async fn listen(self, addr: impl ToSocketAddrs) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if serving fails.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        log::info!("API listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router.into_make_service()).await
    }
}
