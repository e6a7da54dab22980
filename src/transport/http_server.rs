#![forbid(unsafe_code)]
use crate::app_state::AppState;
use crate::codec::form::{decode_form_fields, is_form_content_type};
use crate::error::{Context, Result};
use crate::relay::MessageRecord;
use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub const HEALTH_PATH: &str = "/.well-known/ruok";
pub const ACK_BODY: &str = "ok \n";
pub const HEALTH_BODY: &str = "ok\n";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Health probe on [`HEALTH_PATH`]; every other path accepts inbound texts.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, any(handle_health_probe))
        .fallback(handle_inbound_text)
        .with_state(state)
}

/// Serves until `shutdown` fires, then stops accepting connections and lets
/// open requests finish.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(address = %addr, "text relay listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .await
        .with_context(|| format!("http server on {addr} terminated with error"))
}

async fn handle_inbound_text(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, state.max_payload_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(error = %err, "cannot parse form data");
            Bytes::new()
        }
    };

    let body = form_body(&parts.headers, &bytes);
    let form = decode_form_fields(body, parts.uri.query());
    let record = MessageRecord::from_form(&form);

    info!(
        from = %record.source,
        to = %record.destination,
        kind = %record.kind,
        body = %record.message,
        "received text"
    );

    state.dispatcher.dispatch(record);

    text_response(ACK_BODY)
}

fn form_body<'a>(headers: &HeaderMap, bytes: &'a [u8]) -> Option<&'a [u8]> {
    if bytes.is_empty() {
        return None;
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    if is_form_content_type(content_type) {
        Some(bytes)
    } else {
        error!(
            content_type = content_type.unwrap_or_default(),
            "cannot parse form data, ignoring request body"
        );
        None
    }
}

async fn handle_health_probe() -> Response {
    text_response(HEALTH_BODY)
}

fn text_response(body: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, axum::http::HeaderValue::from_static(TEXT_PLAIN));
    headers.insert(CACHE_CONTROL, axum::http::HeaderValue::from_static("no-store"));
    response
}
