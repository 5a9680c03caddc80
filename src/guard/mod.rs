//! Per-request route guard.
//!
//! The guard decides from the path and the cookie projection alone; it never
//! talks to the identity provider and keeps no state between requests.
//! First matching rule wins:
//!
//! 1. protected path without token markers: redirect to login with
//!    `redirect=<path>`
//! 2. admin path whose primary group is not the admin group: redirect to the
//!    landing page with `error=unauthorized`
//! 3. login path with token markers: redirect to the landing page
//! 4. otherwise continue
//!
//! Token markers are presence checks only. This is a UX gate; the APIs behind
//! the portal still authorize every call.

mod middleware;
mod routes;

pub use middleware::route_guard;
pub use routes::{
    matches_prefix, Classification, RouteTable, RouteTableError, ADMIN_PREFIXES,
    PROTECTED_PREFIXES, PUBLIC_PREFIXES,
};

use url::form_urlencoded;

use crate::session::{CookieProjection, DEFAULT_ADMIN_GROUP};

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING_PATH: &str = "/dashboard";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectReason {
    Unauthenticated,
    Unauthorized,
    AlreadyAuthenticated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Redirect {
        location: String,
        reason: RedirectReason,
    },
}

#[derive(Clone, Debug)]
pub struct RouteGuard {
    table: RouteTable,
    admin_group: String,
    login_path: String,
    landing_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            table: RouteTable::default(),
            admin_group: DEFAULT_ADMIN_GROUP.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            landing_path: DEFAULT_LANDING_PATH.to_string(),
        }
    }
}

impl RouteGuard {
    #[must_use]
    pub fn new(table: RouteTable) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_admin_group(mut self, group: impl Into<String>) -> Self {
        self.admin_group = group.into();
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_landing_path(mut self, path: impl Into<String>) -> Self {
        self.landing_path = path.into();
        self
    }

    /// Reject configurations that can never settle: a guarded login route, or
    /// a landing page that redirects signed-in users again.
    ///
    /// # Errors
    /// Returns the route table error that makes the guard unusable.
    pub fn validated(self) -> Result<Self, RouteTableError> {
        self.table.validate(&self.login_path)?;
        if !self.landing_path.starts_with('/') {
            return Err(RouteTableError::InvalidPrefix(self.landing_path));
        }
        // Signed-in users are sent to the landing page from the login page
        // and from denied admin routes, so it must be neither.
        if self.table.classify(&self.landing_path).admin
            || matches_prefix(&self.landing_path, &self.login_path)
        {
            return Err(RouteTableError::LandingPathLoops(self.landing_path));
        }
        Ok(self)
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    #[must_use]
    pub fn admin_group(&self) -> &str {
        &self.admin_group
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    /// Apply the decision table to one request.
    #[must_use]
    pub fn evaluate(&self, path: &str, cookies: &CookieProjection) -> Decision {
        let class = self.table.classify(path);
        let authenticated = cookies.has_tokens();

        if class.protected && !authenticated {
            return Decision::Redirect {
                location: with_query(&self.login_path, "redirect", path),
                reason: RedirectReason::Unauthenticated,
            };
        }

        let is_admin = cookies.primary_group() == Some(self.admin_group.as_str());
        if class.admin && authenticated && !is_admin {
            return Decision::Redirect {
                location: with_query(&self.landing_path, "error", "unauthorized"),
                reason: RedirectReason::Unauthorized,
            };
        }

        if authenticated && matches_prefix(path, &self.login_path) {
            return Decision::Redirect {
                location: self.landing_path.clone(),
                reason: RedirectReason::AlreadyAuthenticated,
            };
        }

        Decision::Continue
    }
}

fn with_query(path: &str, key: &str, value: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    format!("{path}?{query}")
}
