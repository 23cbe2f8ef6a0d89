use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Ctx;

pub mod api;

/// Mount all routes with the middleware stack.
pub fn mount() -> Router<Ctx> {
    Router::new()
        .merge(api::mount())
        .layer(CatchPanicLayer::custom(api::panic_response))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
