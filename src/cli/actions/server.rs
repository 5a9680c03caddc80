use crate::{cli::telemetry, guard::RouteGuard, portal};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub admin_group: String,
    pub login_path: String,
    pub landing_path: String,
}

impl Args {
    /// Build the route guard described by these arguments.
    ///
    /// # Errors
    /// Returns an error if the login route would itself be protected or the
    /// landing page would redirect signed-in users again.
    pub fn route_guard(&self) -> Result<RouteGuard> {
        RouteGuard::default()
            .with_admin_group(&self.admin_group)
            .with_login_path(&self.login_path)
            .with_landing_path(&self.landing_path)
            .validated()
            .context("invalid route guard configuration")
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the guard configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let guard = Arc::new(args.route_guard()?);

    info!(
        admin_group = guard.admin_group(),
        login_path = guard.login_path(),
        landing_path = guard.landing_path(),
        "route guard configured"
    );

    let result = portal::new(args.port, guard).await;

    telemetry::shutdown_tracer();

    result
}
