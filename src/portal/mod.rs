use crate::guard::{route_guard, RouteGuard};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::from_fn_with_state,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

const REQUEST_ID: &str = "x-request-id";

/// Portal router: documented endpoints, pages and the route guard in front
/// of all of them.
#[must_use]
pub fn router(guard: Arc<RouteGuard>) -> Router {
    let (api, _openapi) = openapi::api_router().split_for_parts();

    api.merge(handlers::pages::routes())
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(guard, route_guard))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, guard: Arc<RouteGuard>) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    serve(listener, guard).await
}

/// Serve the portal on an already bound listener until Ctrl-C.
/// # Errors
/// Return error if the server fails
pub async fn serve(listener: TcpListener, guard: Arc<RouteGuard>) -> Result<()> {
    axum::serve(listener, router(guard).into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
