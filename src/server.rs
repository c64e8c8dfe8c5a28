//! HTTP surface: one resource, `/products`, and a 404 for everything else.

use crate::config::ServerConfig;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::store::{ProductStore, StoreHandle};
use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Query pairs on `/products`, in order. Only `id` is read; when it is
/// repeated the last occurrence wins.
#[derive(Debug, Default)]
pub struct ProductQuery(pub Vec<(String, String)>);

impl ProductQuery {
    /// Raw value of the last `id` pair, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.as_str())
    }
}

/// Router serving `/products` through `dispatcher`.
pub fn app(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/products", any(products))
        .fallback(not_found)
        .with_state(dispatcher)
}

async fn products(
    State(dispatcher): State<Arc<Dispatcher>>,
    method: Method,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Body,
) -> Response {
    let query = match query {
        Ok(Query(pairs)) => ProductQuery(pairs),
        Err(e) => {
            debug!(%method, "unreadable query string: {e}");
            return DispatchError::BadRequest.into_response();
        }
    };
    dispatcher.handle(&method, query.id(), body).await
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Bound listener plus the store it serves.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Open the store and bind the listener described by `config`.
    pub async fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        let store = ProductStore::builder(&config.data)
            .policy(config.flush_policy())
            .pretty(!config.compact)
            .id_strategy(config.id_strategy)
            .build()?;
        info!("Product store at {}", store.path().display());

        let dispatcher = Dispatcher::new(Arc::new(store))
            .with_limits(config.body_limits())
            .with_put_mode(config.put_mode);

        let listener = TcpListener::bind(config.bind).await?;
        let local_addr = listener.local_addr()?;
        info!("HTTP server bound to {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Get local listening address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The store behind this server.
    pub fn store(&self) -> &Arc<StoreHandle> {
        self.dispatcher.store()
    }

    /// Serve until `shutdown` resolves, then flush the store one last time.
    pub async fn run<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Server running on http://{}", self.local_addr);
        let store = Arc::clone(self.dispatcher.store());

        axum::serve(self.listener, app(self.dispatcher))
            .with_graceful_shutdown(shutdown)
            .await?;

        // Under the immediate policy every write already reached disk, and
        // flushing the cached copy could clobber edits made to the file since.
        if !store.policy().reads_from_disk() {
            info!("Server stopped, flushing products");
            if let Err(e) = store.flush() {
                error!("Final flush of {} failed: {e}", store.path().display());
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
