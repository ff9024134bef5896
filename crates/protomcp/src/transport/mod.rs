//! MCP HTTP Transport
//!
//! Stateless single-exchange JSON-RPC over HTTP:
//! - POST <path> - one JSON-RPC message in, one response (or none) out
//! - OPTIONS <path> - 204, for pre-flight requests
//!
//! Status mapping: unparseable or malformed messages and routing failures
//! (unknown method or tool) get 400, notifications get 204 with no body,
//! everything else gets 200 with a JSON-RPC body, including in-band errors.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;

use crate::protocol::Dispatcher;
use crate::types::error::ErrorData;
use crate::types::jsonrpc::{JsonRpcMessage, JsonRpcResponse, RequestId};

/// Build an axum Router serving the dispatcher at `path`.
pub fn router(dispatcher: Dispatcher, path: &str) -> Router {
    Router::new()
        .route(
            path,
            post(post_handler)
                .options(options_handler)
                .fallback(invalid_method_handler),
        )
        .with_state(dispatcher)
}

/// Handle one JSON-RPC message.
#[tracing::instrument(skip_all)]
pub async fn post_handler(State(dispatcher): State<Dispatcher>, body: Bytes) -> Response {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable request body");
            return error_response(None, ErrorData::parse_error(format!("parse error: {}", e)));
        }
    };

    if body.is_array() {
        return error_response(
            None,
            ErrorData::invalid_request("invalid request: batch requests are not supported"),
        );
    }

    // Echo the id on invalid requests when it is readable
    let request_id = body
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

    let message: JsonRpcMessage = match serde_json::from_value(body) {
        Ok(message) => message,
        Err(e) => {
            return error_response(
                request_id,
                ErrorData::invalid_request(format!("invalid request: {}", e)),
            );
        }
    };

    match dispatcher.dispatch(&message).await {
        Some(response) => (response_status(&response), Json(response)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Routing failures (unknown method or tool) are 400; other errors stay in-band.
fn response_status(response: &JsonRpcResponse) -> StatusCode {
    match &response.error {
        Some(error)
            if error.code == ErrorData::METHOD_NOT_FOUND
                || error.code == ErrorData::INVALID_REQUEST =>
        {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::OK,
    }
}

async fn options_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn invalid_method_handler() -> Response {
    error_response(None, ErrorData::invalid_request("invalid request method"))
}

fn error_response(id: Option<RequestId>, error: ErrorData) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(JsonRpcResponse::failure(id, error)),
    )
        .into_response()
}
