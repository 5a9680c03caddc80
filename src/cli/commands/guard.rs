use clap::{Arg, ArgMatches, Command};

use crate::guard::{DEFAULT_LANDING_PATH, DEFAULT_LOGIN_PATH};
use crate::session::DEFAULT_ADMIN_GROUP;

pub const ARG_ADMIN_GROUP: &str = "admin-group";
pub const ARG_LOGIN_PATH: &str = "login-path";
pub const ARG_LANDING_PATH: &str = "landing-path";

#[derive(Debug, Clone)]
pub struct Options {
    pub admin_group: String,
    pub login_path: String,
    pub landing_path: String,
}

impl Options {
    /// Parse route guard arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a value is missing or blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            admin_group: read_required(ARG_ADMIN_GROUP)?,
            login_path: read_required(ARG_LOGIN_PATH)?,
            landing_path: read_required(ARG_LANDING_PATH)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ADMIN_GROUP)
                .long(ARG_ADMIN_GROUP)
                .help("Group whose members may open admin routes")
                .env("DATAWOVEN_ADMIN_GROUP")
                .default_value(DEFAULT_ADMIN_GROUP),
        )
        .arg(
            Arg::new(ARG_LOGIN_PATH)
                .long(ARG_LOGIN_PATH)
                .help("Route anonymous visitors are sent to")
                .env("DATAWOVEN_LOGIN_PATH")
                .default_value(DEFAULT_LOGIN_PATH),
        )
        .arg(
            Arg::new(ARG_LANDING_PATH)
                .long(ARG_LANDING_PATH)
                .help("Route signed-in users land on")
                .env("DATAWOVEN_LANDING_PATH")
                .default_value(DEFAULT_LANDING_PATH),
        )
}
