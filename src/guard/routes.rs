//! Static route classification.
//!
//! Prefixes match whole path segments: `/admin` covers `/admin` and
//! `/admin/users` but not `/administrator`. The root prefix `/` only ever
//! matches `/` itself.

use thiserror::Error;

pub const PROTECTED_PREFIXES: [&str; 5] = [
    "/dashboard",
    "/discovery",
    "/implementation",
    "/account",
    "/admin",
];
pub const ADMIN_PREFIXES: [&str; 1] = ["/admin"];
pub const PUBLIC_PREFIXES: [&str; 5] = [
    "/login",
    "/signup",
    "/forgot-password",
    "/reset-password",
    "/",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("route prefix must start with '/': {0}")]
    InvalidPrefix(String),
    #[error("login path {0} is protected and could never be reached")]
    LoginPathProtected(String),
    #[error("landing path {0} would redirect signed-in users back to itself")]
    LandingPathLoops(String),
}

/// Categories a path falls into. They are not exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub protected: bool,
    pub admin: bool,
    pub public: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTable {
    protected: Vec<String>,
    admin: Vec<String>,
    public: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        let owned = |prefixes: &[&str]| prefixes.iter().map(ToString::to_string).collect();
        Self {
            protected: owned(&PROTECTED_PREFIXES),
            admin: owned(&ADMIN_PREFIXES),
            public: owned(&PUBLIC_PREFIXES),
        }
    }
}

impl RouteTable {
    /// A table with no routes at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            protected: Vec::new(),
            admin: Vec::new(),
            public: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_protected(mut self, prefix: &str) -> Self {
        push_unique(&mut self.protected, prefix);
        self
    }

    /// Admin prefixes are always protected too.
    #[must_use]
    pub fn with_admin(mut self, prefix: &str) -> Self {
        push_unique(&mut self.admin, prefix);
        push_unique(&mut self.protected, prefix);
        self
    }

    #[must_use]
    pub fn with_public(mut self, prefix: &str) -> Self {
        push_unique(&mut self.public, prefix);
        self
    }

    #[must_use]
    pub fn classify(&self, path: &str) -> Classification {
        let any = |prefixes: &[String]| prefixes.iter().any(|prefix| matches_prefix(path, prefix));
        Classification {
            protected: any(&self.protected),
            admin: any(&self.admin),
            public: any(&self.public),
        }
    }

    /// Check prefixes and make sure the login route stays reachable.
    ///
    /// # Errors
    /// Returns the first offending prefix.
    pub fn validate(&self, login_path: &str) -> Result<(), RouteTableError> {
        if let Some(prefix) = self
            .protected
            .iter()
            .chain(&self.admin)
            .chain(&self.public)
            .map(String::as_str)
            .chain(std::iter::once(login_path))
            .find(|prefix| !prefix.starts_with('/'))
        {
            return Err(RouteTableError::InvalidPrefix(prefix.to_string()));
        }
        if self.classify(login_path).protected {
            return Err(RouteTableError::LoginPathProtected(login_path.to_string()));
        }
        Ok(())
    }
}

fn push_unique(prefixes: &mut Vec<String>, prefix: &str) {
    let prefix = normalize(prefix);
    if !prefixes.contains(&prefix) {
        prefixes.push(prefix);
    }
}

fn normalize(prefix: &str) -> String {
    let trimmed = prefix.trim();
    match trimmed.trim_end_matches('/') {
        "" if trimmed.starts_with('/') => "/".to_string(),
        stripped => stripped.to_string(),
    }
}

/// Segment-aware prefix match; `/` matches only the root.
#[must_use]
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
