//! Slack webhook relay service.
//!
//! Receives Slack Events API callbacks, verifies the signing secret, and
//! relays the interesting ones: `ping` replies, DocBase post forwarding,
//! and emoji / channel announcements. Runs either as an AWS Lambda
//! function or as a local HTTP listener on `/slack/events`; both entry
//! points funnel into the same dispatcher.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chatrelay_core::{DispatchResult, Dispatcher, DocbaseClient, RelayConfig, SlackNotifier};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Arc::new(RelayConfig::from_env()?);
    let http = reqwest::Client::new();
    let notifier = Arc::new(SlackNotifier::new(
        http.clone(),
        config.bot_token.clone(),
        config.slack_api_base.clone(),
    ));
    let store = Arc::new(DocbaseClient::new(
        http,
        config.docbase_domain.clone(),
        config.docbase_token.clone(),
        config.docbase_api_base.clone(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&config), notifier, store));

    // The Rust Lambda runtime itself requires this variable, which makes it
    // a reliable managed-environment marker.
    if std::env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        run_lambda(dispatcher).await
    } else {
        run_server(config.bind, dispatcher).await
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_server(bind: SocketAddr, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let app = router(dispatcher);
    tracing::info!("relay listening on {bind}");
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/slack/events", post(handle))
        .with_state(AppState { dispatcher })
}

async fn handle(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    state.dispatcher.handle(&headers, &body).await.into_response()
}

async fn run_lambda(dispatcher: Arc<Dispatcher>) -> Result<()> {
    let handler = lambda_http::service_fn(move |request: lambda_http::Request| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { handle_lambda(&dispatcher, request).await }
    });
    lambda_http::run(handler)
        .await
        .map_err(|err| anyhow::anyhow!("lambda runtime: {err}"))
}

/// Lambda freezes the execution environment as soon as the response is
/// returned, which would suspend or lose a still-running DocBase forward.
/// Settling drives it to completion first; the result itself is unchanged
/// either way.
async fn handle_lambda(
    dispatcher: &Dispatcher,
    request: lambda_http::Request,
) -> Result<lambda_http::Response<lambda_http::Body>, lambda_http::Error> {
    let (parts, body) = request.into_parts();
    let mut result = dispatcher.handle(&parts.headers, body_bytes(&body)).await;
    result.settle().await;
    lambda_response(result)
}

fn body_bytes(body: &lambda_http::Body) -> &[u8] {
    match body {
        lambda_http::Body::Empty => &[],
        lambda_http::Body::Text(text) => text.as_bytes(),
        lambda_http::Body::Binary(data) => data.as_slice(),
    }
}

fn lambda_response(
    result: DispatchResult,
) -> Result<lambda_http::Response<lambda_http::Body>, lambda_http::Error> {
    let mut builder = lambda_http::Response::builder().status(result.status.as_u16());
    for (name, value) in result.headers.iter() {
        builder = builder.header(name.as_str(), value.as_bytes());
    }
    builder
        .body(lambda_http::Body::from(result.body))
        .map_err(lambda_http::Error::from)
}
