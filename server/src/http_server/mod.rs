use std::net::SocketAddr;

use axum::{response::Response, Router};
use color_eyre::eyre::WrapErr;
use tokio::net::TcpListener;

use crate::{AppState, Result};
pub(crate) use errors::{ServerError, WithStatus};

pub(crate) mod api;
pub(crate) mod current_user;
pub(crate) mod errors;
mod routes;
mod trace;

#[cfg(test)]
pub(crate) mod test_helpers;

pub(crate) type ResponseResult<T = Response> = std::result::Result<T, ServerError>;

/// The full application: routes, state and request tracing.
pub(crate) fn app(state: AppState) -> Router {
    let tracer = trace::Tracer;
    let trace_layer = tower_http::trace::TraceLayer::new_for_http()
        .make_span_with(tracer)
        .on_response(tracer);

    routes::make_router().with_state(state).layer(trace_layer)
}

pub(crate) async fn run_server(state: AppState) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.app.port));
    let app = app(state);

    tracing::info!("Starting server on port {}", addr.port());
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err("Failed to open port")?;

    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .await
        .wrap_err("Failed to run server")
}
