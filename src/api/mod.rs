//! HTTP surface: `GET /status` and `GET /health`.

pub mod handlers;
mod openapi;

pub use self::openapi::openapi;

use crate::{
    directory::DirectorySource,
    duo::MfaSource,
    error::ResolveError,
    status::{StatusService, UnifiedStatus},
};
use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
};
use std::{future::Future, pin::Pin, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

pub const DEFAULT_REMOTE_USER_HEADER: &str = "X-Remote-User";

const REQUEST_ID: &str = "x-request-id";

/// Object-safe view of a [`StatusService`], so handlers stay free of source generics.
pub trait StatusLookup: Send + Sync {
    fn status<'a>(
        &'a self,
        username: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<UnifiedStatus, ResolveError>> + Send + 'a>>;

    /// Name of the configured cache backend.
    fn cache_backend(&self) -> &'static str;
}

impl<M, D> StatusLookup for StatusService<M, D>
where
    M: MfaSource,
    D: DirectorySource,
{
    fn status<'a>(
        &'a self,
        username: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<UnifiedStatus, ResolveError>> + Send + 'a>> {
        Box::pin(self.status(username))
    }

    fn cache_backend(&self) -> &'static str {
        self.cache().backend()
    }
}

/// Shared, immutable request state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn StatusLookup>,
    pub remote_user_header: HeaderName,
}

impl AppState {
    pub fn new(service: Arc<dyn StatusLookup>, remote_user_header: HeaderName) -> Self {
        Self {
            service,
            remote_user_header,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(handlers::status))
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Serve `app` on `[::]:port` until SIGINT or SIGTERM.
///
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(port: u16, app: Router) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gracefully shutdown");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
}

fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let method = request.method().as_str();
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    info_span!("http-request", http.method = method, path, request_id)
}
