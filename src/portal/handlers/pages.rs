//! Placeholder portal pages fronted by the route guard.

use axum::{
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde::Deserialize;

/// Seconds before the unauthorized notice removes itself.
pub const NOTICE_DISMISS_SECONDS: u64 = 5;

const UNAUTHORIZED: &str = "unauthorized";

#[derive(Clone, Copy, Debug)]
pub struct Page {
    pub path: &'static str,
    pub title: &'static str,
}

pub const PAGES: [Page; 10] = [
    Page { path: "/", title: "DataWoven" },
    Page { path: "/login", title: "Sign in" },
    Page { path: "/signup", title: "Create account" },
    Page { path: "/forgot-password", title: "Forgot password" },
    Page { path: "/reset-password", title: "Reset password" },
    Page { path: "/dashboard", title: "Dashboard" },
    Page { path: "/discovery", title: "Discovery" },
    Page { path: "/implementation", title: "Implementation" },
    Page { path: "/account", title: "Account" },
    Page { path: "/admin", title: "Administration" },
];

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    error: Option<String>,
}

/// Routes for every portal page.
pub fn routes() -> Router {
    PAGES.iter().fold(Router::new(), |router, &page| {
        router.route(
            page.path,
            get(move |Query(query): Query<PageQuery>| async move { render(page, &query) }),
        )
    })
}

fn render(page: Page, query: &PageQuery) -> Html<String> {
    let notice = if query.error.as_deref() == Some(UNAUTHORIZED) {
        unauthorized_notice()
    } else {
        String::new()
    };
    Html(layout(page.title, &notice))
}

fn unauthorized_notice() -> String {
    format!(
        concat!(
            r#"<div id="notice" role="alert">You do not have access to that page.</div>"#,
            r#"<script>setTimeout(() => document.getElementById("notice")?.remove(), {});</script>"#,
        ),
        NOTICE_DISMISS_SECONDS * 1000
    )
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{title}</h1>{body}</body></html>"
    )
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(layout("Not found", "")))
}
