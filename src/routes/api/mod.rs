use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::dispatch::types::MediaRecord;
use crate::dispatch::{Rejection, Result as DispatchResult, SearchOutcome};
use crate::{COPYRIGHT, Ctx};

pub mod health;

/// Request parameters, accepted as query string or JSON body.
/// Body fields override same-named query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiParams {
    pub source: Option<String>,
    pub query: Option<String>,
    pub url: Option<String>,
    pub tmdb_id: Option<String>,
    pub sid: Option<String>,
    pub key: Option<String>,
}

impl ApiParams {
    /// Field-by-field merge, `other` taking precedence.
    fn overlaid(self, other: Self) -> Self {
        Self {
            source: other.source.or(self.source),
            query: other.query.or(self.query),
            url: other.url.or(self.url),
            tmdb_id: other.tmdb_id.or(self.tmdb_id),
            sid: other.sid.or(self.sid),
            key: other.key.or(self.key),
        }
    }
}

// ============ Handlers ============

/// Main query endpoint
/// POST / or /api
async fn query(
    State(ctx): State<Ctx>,
    uri: Uri,
    headers: HeaderMap,
    Query(query_params): Query<ApiParams>,
    body: Bytes,
) -> Response {
    let body_params = if body.is_empty() {
        ApiParams::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            debug!("ignoring unparseable request body: {e}");
            ApiParams::default()
        })
    };
    let params = query_params.overlaid(body_params);

    let raw_uri = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());
    if let Err(rejection) = ctx
        .validator
        .validate(&raw_uri, &headers, params.key.as_deref())
    {
        return rejection_response(&ctx, rejection);
    }

    route_params(&ctx, &params).await
}

/// Parameter precedence: url, then source+query, then bare query, then
/// tmdb_id / source+sid, else a usage error.
async fn route_params(ctx: &Ctx, params: &ApiParams) -> Response {
    if let Some(url) = &params.url {
        return dispatch_response(ctx, ctx.manager.dispatch_url(url).await);
    }
    if let (Some(source), Some(query)) = (&params.source, &params.query) {
        return search_response(ctx, ctx.search.search(source, query).await);
    }
    if let Some(query) = &params.query {
        return search_response(ctx, ctx.search.auto_search(query).await);
    }
    if let Some(tmdb_id) = &params.tmdb_id {
        return dispatch_response(ctx, ctx.manager.dispatch_source("tmdb", tmdb_id).await);
    }
    if let (Some(source), Some(sid)) = (&params.source, &params.sid) {
        return dispatch_response(ctx, ctx.manager.dispatch_source(source, sid).await);
    }

    let body = envelope(
        ctx,
        false,
        Some("Expected one of: url; source+query; query; tmdb_id; source+sid".to_string()),
        String::new(),
        json!({}),
    );
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Documentation page, public regardless of API-key configuration
/// GET / or /api
async fn docs() -> Html<&'static str> {
    Html(DOCS_HTML)
}

/// 404 for anything outside the API surface
async fn fallback(State(ctx): State<Ctx>) -> Response {
    let body = envelope(
        &ctx,
        false,
        Some("Not found".to_string()),
        String::new(),
        json!({}),
    );
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

/// Generic 500 for panicking handlers; details stay in server logs.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("handler panicked: {detail}");

    let body = json!({
        "success": false,
        "error": "Internal server error",
        "format": "",
        "version": env!("CARGO_PKG_VERSION"),
        "copyright": COPYRIGHT,
        "generate_at": Utc::now().timestamp_millis(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

// ============ Envelope assembly ============

/// Wrap a payload in the response envelope. Envelope fields win over
/// same-named payload fields.
fn envelope(
    ctx: &Ctx,
    success: bool,
    error: Option<String>,
    format: String,
    payload: Value,
) -> Value {
    let mut body = json!({
        "success": success,
        "error": error,
        "format": format,
        "version": env!("CARGO_PKG_VERSION"),
        "copyright": ctx.settings.copyright.as_deref().unwrap_or(COPYRIGHT),
        "generate_at": Utc::now().timestamp_millis(),
    });

    if let (Value::Object(map), Value::Object(extra)) = (&mut body, payload) {
        for (key, value) in extra {
            map.entry(key).or_insert(value);
        }
    }
    body
}

fn dispatch_response(ctx: &Ctx, outcome: DispatchResult<MediaRecord>) -> Response {
    match outcome {
        Ok(record) => record_response(ctx, record),
        // Client-side dispatch errors stay HTTP 200 so callers always see
        // a structured payload
        Err(e) => Json(envelope(
            ctx,
            false,
            Some(e.to_string()),
            String::new(),
            json!({}),
        ))
        .into_response(),
    }
}

fn record_response(ctx: &Ctx, record: MediaRecord) -> Response {
    let success = record.success;
    let error = record.error.clone();
    let format = record.format.clone().unwrap_or_default();
    let payload = serde_json::to_value(&record).unwrap_or_else(|_| json!({}));
    Json(envelope(ctx, success, error, format, payload)).into_response()
}

fn search_response(ctx: &Ctx, outcome: SearchOutcome) -> Response {
    let body = envelope(
        ctx,
        outcome.success,
        outcome.error.clone(),
        String::new(),
        json!({ "data": outcome.data }),
    );
    Json(body).into_response()
}

fn rejection_response(ctx: &Ctx, rejection: Rejection) -> Response {
    let status =
        StatusCode::from_u16(rejection.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = envelope(
        ctx,
        false,
        Some(rejection.message().to_string()),
        String::new(),
        json!({}),
    );
    (status, Json(body)).into_response()
}

/// Mount API routes
pub fn mount() -> Router<Ctx> {
    Router::new()
        .route("/", get(docs).post(query))
        .route("/api", get(docs).post(query))
        .merge(health::mount())
        .fallback(fallback)
}

const DOCS_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>mediagen</title>
<style>
  body { font-family: sans-serif; max-width: 720px; margin: 2em auto; padding: 0 1em; }
  code { background: #f4f4f4; padding: 0.1em 0.3em; }
  pre { background: #f4f4f4; padding: 1em; overflow-x: auto; }
</style>
</head>
<body>
<h1>mediagen</h1>
<p>Media metadata aggregation. POST to <code>/</code> or <code>/api</code> with JSON
body or query parameters; body fields win.</p>
<h2>Parameters</h2>
<ul>
  <li><code>url</code> — a media page URL (Douban, IMDb, TMDB, Bangumi, Steam, Melon, QQ Music)</li>
  <li><code>source</code> + <code>query</code> — search an explicit backend (<code>imdb</code> or <code>tmdb</code>)</li>
  <li><code>query</code> — search with automatic backend selection</li>
  <li><code>tmdb_id</code> — direct TMDB lookup, e.g. <code>movie/550</code></li>
  <li><code>source</code> + <code>sid</code> — direct lookup by provider and identifier</li>
  <li><code>key</code> — API key, when the deployment requires one</li>
</ul>
<h2>Example</h2>
<pre>curl -X POST /api -H 'Content-Type: application/json' \
  -d '{"source":"tmdb","sid":"movie/550"}'</pre>
<p>Responses carry <code>success</code>, <code>error</code>, <code>format</code>
(forum-ready text), <code>version</code>, <code>copyright</code> and
<code>generate_at</code> alongside the record fields.</p>
</body>
</html>
"#;
