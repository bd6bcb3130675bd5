//! The catch-all REST handler: HTTP request in, routed and dispatched,
//! response serialised per the requested representation.

use crate::auth::Actor;
use crate::error::ApiError;
use crate::kernel::{dispatch, rows_to_csv, to_xml, KernelResponse};
use crate::router::{route, HttpVerb, Representation, Routed};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Actor from headers. Hosts terminate authentication upstream and forward
/// the user id; absent header means anonymous.
fn actor_from_headers(headers: &HeaderMap) -> Actor {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .map(Actor::user)
        .unwrap_or_else(Actor::anonymous)
}

fn parse_body(bytes: &Bytes) -> Result<Option<Value>, ApiError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))
}

fn see_other(location: &str) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

pub async fn rest_handler(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    Query(vars): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<Response, ApiError> {
    let verb = HttpVerb::from_method(&method)
        .ok_or_else(|| ApiError::BadRequest(format!("unsupported method: {}", method)))?;
    let actor = actor_from_headers(&headers);
    let body = parse_body(&bytes)?;

    let request = match route(&state.settings, verb, &path, vars, body)? {
        Routed::Redirect(location) => return Ok(see_other(&location)),
        Routed::Request(request) => request,
    };
    tracing::debug!(
        prefix = %request.prefix,
        name = %request.name,
        method = ?request.method,
        representation = request.representation.as_str(),
        "dispatch"
    );
    let response = dispatch(&state, &request, &actor).await?;
    render_response(&state, response)
}

/// Serialise the kernel's structured context per the representation. CSV and
/// XML are flat formats owned here; document formats go to the renderer.
fn render_response(state: &AppState, response: KernelResponse) -> Result<Response, ApiError> {
    if let Some(location) = &response.location {
        return Ok(see_other(location));
    }
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match &response.representation {
        Representation::Json => {
            let mut envelope = json!({ "data": response.context });
            if let Some(message) = &response.message {
                envelope["message"] = json!(message);
            }
            Ok((status, Json(envelope)).into_response())
        }
        Representation::Csv => {
            let columns: Vec<String> = response
                .context
                .get("columns")
                .and_then(|v| v.as_array())
                .map(|cols| {
                    cols.iter()
                        .filter_map(|c| c.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            let empty = Vec::new();
            let rows = response
                .context
                .get("rows")
                .and_then(|v| v.as_array())
                .unwrap_or(&empty);
            let csv = rows_to_csv(&columns, rows);
            Ok((
                status,
                [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
                csv,
            )
                .into_response())
        }
        Representation::Xml => {
            let root = response
                .context
                .get("resource")
                .and_then(|v| v.as_str())
                .unwrap_or("resource")
                .to_string();
            let xml = to_xml(&root, &response.context);
            Ok((
                status,
                [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
                xml,
            )
                .into_response())
        }
        other => {
            let doc = state.renderer.render(other, &response.context)?;
            Ok((
                status,
                [(header::CONTENT_TYPE, doc.content_type.clone())],
                doc.bytes,
            )
                .into_response())
        }
    }
}
