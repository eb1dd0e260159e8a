//! Dispatch of requests under the plugin prefix.
//!
//! The router forwards `METHOD <prefix>/<rest>` here; the route is looked up
//! in the live dispatch table as `/<rest>` on every request. Matching runs on
//! the raw, still-encoded path so an escaped `/` stays inside its segment;
//! captured parameters are decoded afterwards.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::debug;

use plughub_core::error::AppError;
use plughub_plugin::PluginRequest;

use crate::error::ApiError;
use crate::state::AppState;

/// ANY {prefix}/{*rest}
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let path = uri
        .path()
        .strip_prefix(state.plugin_prefix.as_str())
        .unwrap_or(uri.path())
        .to_string();

    let route = state
        .routes
        .resolve(&method, &path)
        .await
        .ok_or_else(|| AppError::not_found(format!("No plugin route for {method} {path}")))?;

    debug!(
        method = %method,
        path = %path,
        plugin_id = %route.plugin_id,
        handler = %route.handler,
        "Dispatching plugin request"
    );

    let params = decode_params(route.params)?;

    let request = PluginRequest {
        method,
        path,
        params,
        query,
        headers,
        body,
    };

    let response = route.controller.handle(&route.handler, request).await?;

    if response.status == StatusCode::NO_CONTENT {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok((response.status, Json(response.body)).into_response())
}

/// Percent-decodes captured path parameters.
fn decode_params(params: HashMap<String, String>) -> Result<HashMap<String, String>, AppError> {
    params
        .into_iter()
        .map(|(name, raw)| {
            let value = urlencoding::decode(&raw)
                .map_err(|_| {
                    AppError::validation(format!("Path parameter '{name}' is not valid UTF-8"))
                })?
                .into_owned();
            Ok((name, value))
        })
        .collect()
}

/// Fallback for anything no route matched.
pub async fn not_found(method: Method, uri: axum::http::Uri) -> ApiError {
    ApiError::from(AppError::not_found(format!(
        "No route for {method} {}",
        uri.path()
    )))
}
