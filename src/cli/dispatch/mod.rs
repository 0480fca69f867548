//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary runs, which today is
//! always the admin gateway server.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::admin;
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .map(|dsn| dsn.trim().to_string())
        .filter(|dsn| !dsn.is_empty());

    let admin_opts = admin::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        admin_username: admin_opts.username,
        admin_password: admin_opts.password,
        admin_password_salt: admin_opts.password_salt,
        frontend_base_url: admin_opts.frontend_base_url,
        session_ttl_seconds: admin_opts.session_ttl_seconds,
        session_sweep_seconds: admin_opts.session_sweep_seconds,
        login_max_failures: admin_opts.login_max_failures,
        login_window_seconds: admin_opts.login_window_seconds,
        trust_proxy_headers: admin_opts.trust_proxy_headers,
    }))
}
