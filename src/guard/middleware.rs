use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::debug;

use super::{Decision, RouteGuard};
use crate::session::CookieProjection;

/// Axum middleware applying [`RouteGuard::evaluate`] to every request.
///
/// Mount with `axum::middleware::from_fn_with_state(guard, route_guard)`.
pub async fn route_guard(
    State(guard): State<Arc<RouteGuard>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let projection = CookieProjection::from_jar(&jar);
    match guard.evaluate(request.uri().path(), &projection) {
        Decision::Continue => next.run(request).await,
        Decision::Redirect { location, reason } => {
            debug!(
                path = request.uri().path(),
                ?reason,
                location = location.as_str(),
                "route guard redirect"
            );
            Redirect::temporary(&location).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE, USER_GROUP_COOKIE};
    use axum::{
        body::Body,
        http::{
            self,
            header::{COOKIE, LOCATION},
            StatusCode,
        },
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/dashboard", get(|| async { "dashboard" }))
            .route("/admin", get(|| async { "admin" }))
            .route("/login", get(|| async { "login" }))
            .layer(from_fn_with_state(
                Arc::new(RouteGuard::default()),
                route_guard,
            ))
    }

    fn request(path: &str, cookie: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn signed_in(group: &str) -> String {
        format!(
            "{ACCESS_TOKEN_COOKIE}=a; {ID_TOKEN_COOKIE}=i; {USER_GROUP_COOKIE}={group}"
        )
    }

    #[tokio::test]
    async fn anonymous_dashboard_redirects_to_login() {
        let response = app()
            .oneshot(request("/dashboard", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/login?redirect=%2Fdashboard"
        );
    }

    #[tokio::test]
    async fn signed_in_request_reaches_handler() {
        let cookie = signed_in("ImplementationUser");
        let response = app()
            .oneshot(request("/dashboard", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_admin_is_sent_back_with_error() {
        let cookie = signed_in("ImplementationUser");
        let response = app()
            .oneshot(request("/admin", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/dashboard?error=unauthorized"
        );
    }

    #[tokio::test]
    async fn admin_reaches_admin_page() {
        let cookie = signed_in("DataWovenAdmin");
        let response = app()
            .oneshot(request("/admin", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_token_cookies_count_as_signed_out() {
        let cookie = format!("{ACCESS_TOKEN_COOKIE}=; {ID_TOKEN_COOKIE}=");
        let response = app()
            .oneshot(request("/dashboard", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn login_redirects_when_already_signed_in() {
        let cookie = signed_in("ImplementationUser");
        let response = app()
            .oneshot(request("/login", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/dashboard");
    }
}
