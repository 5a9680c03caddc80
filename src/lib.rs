//! # DataWoven portal session gate
//!
//! Session and authorization slice of the DataWoven customer portal.
//!
//! ## Auth State Store
//!
//! [`session::AuthStore`] holds the signed-in user (id, e-mail, ordered group
//! memberships, attributes) and a loading flag. It is populated from the
//! identity provider on mount and after every successful sign-in, and it is
//! an explicit value passed to whatever renders the portal.
//!
//! ## Cookie Bridge
//!
//! [`session::CookieBridge`] mirrors a lossy projection of the store (token
//! presence and the primary group) into three cookies that live for one hour.
//! A failed refresh or a logout removes all of them.
//!
//! ## Route Guard
//!
//! [`guard::RouteGuard`] runs on every request, reads only those cookies and
//! the static route table, and either lets the request through or redirects:
//!
//! - **Protected routes** without token markers go to the login route with a
//!   `redirect` parameter.
//! - **Admin routes** require the administrative group as primary group;
//!   everyone else lands on the landing page with `error=unauthorized`.
//! - **The login route** sends signed-in users to the landing page.
//!
//! The guard is a navigation gate. It checks cookie presence, never token
//! validity, and the services behind the portal authorize every call again.

pub mod cli;
pub mod guard;
pub mod portal;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
