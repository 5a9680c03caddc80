//! Map parsed CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::guard;
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or blank.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let guard_opts = guard::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        admin_group: guard_opts.admin_group,
        login_path: guard_opts.login_path,
        landing_path: guard_opts.landing_path,
    }))
}
