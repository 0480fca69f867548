use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_ADMIN_USERNAME: &str = "admin-username";
pub const ARG_ADMIN_PASSWORD: &str = "admin-password";
pub const ARG_ADMIN_PASSWORD_SALT: &str = "admin-password-salt";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SESSION_SWEEP_SECONDS: &str = "session-sweep-seconds";
pub const ARG_LOGIN_MAX_FAILURES: &str = "login-max-failures";
pub const ARG_LOGIN_WINDOW_SECONDS: &str = "login-window-seconds";
pub const ARG_TRUST_PROXY_HEADERS: &str = "trust-proxy-headers";

pub fn with_args(command: Command) -> Command {
    let command = with_credential_args(command);
    with_session_args(command)
}

fn with_credential_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ADMIN_USERNAME)
                .long(ARG_ADMIN_USERNAME)
                .help("Admin login username")
                .env("VIDMARKET_ADMIN_USERNAME")
                .required(true),
        )
        .arg(
            Arg::new(ARG_ADMIN_PASSWORD)
                .long(ARG_ADMIN_PASSWORD)
                .help("Admin login password")
                .env("VIDMARKET_ADMIN_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ADMIN_PASSWORD_SALT)
                .long(ARG_ADMIN_PASSWORD_SALT)
                .help("Salt for the admin password digest (at least 8 bytes)")
                .env("VIDMARKET_ADMIN_PASSWORD_SALT")
                .hide_env_values(true)
                .default_value("vidmarket-admin-salt"),
        )
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Admin frontend base URL, used for CORS and the cookie Secure flag")
                .env("VIDMARKET_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Admin session TTL in seconds, renewed on every authorized request")
                .env("VIDMARKET_SESSION_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_SWEEP_SECONDS)
                .long(ARG_SESSION_SWEEP_SECONDS)
                .help("Interval between expired session sweeps in seconds")
                .env("VIDMARKET_SESSION_SWEEP_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOGIN_MAX_FAILURES)
                .long(ARG_LOGIN_MAX_FAILURES)
                .help("Failed logins allowed per client address inside one window")
                .env("VIDMARKET_LOGIN_MAX_FAILURES")
                .default_value("5")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOGIN_WINDOW_SECONDS)
                .long(ARG_LOGIN_WINDOW_SECONDS)
                .help("Login failure window in seconds")
                .env("VIDMARKET_LOGIN_WINDOW_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_TRUST_PROXY_HEADERS)
                .long(ARG_TRUST_PROXY_HEADERS)
                .help("Key login throttling on X-Forwarded-For / X-Real-IP (only behind a trusted proxy)")
                .env("VIDMARKET_TRUST_PROXY_HEADERS")
                .action(clap::ArgAction::SetTrue),
        )
}

#[derive(Debug)]
pub struct Options {
    pub username: String,
    pub password: SecretString,
    pub password_salt: SecretString,
    pub frontend_base_url: String,
    pub session_ttl_seconds: u64,
    pub session_sweep_seconds: u64,
    pub login_max_failures: u32,
    pub login_window_seconds: u64,
    pub trust_proxy_headers: bool,
}

impl Options {
    /// Parse admin auth options from CLI matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let username = matches
            .get_one::<String>(ARG_ADMIN_USERNAME)
            .cloned()
            .context("missing required argument: --admin-username")?;
        let password = matches
            .get_one::<String>(ARG_ADMIN_PASSWORD)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --admin-password")?;
        let password_salt = matches
            .get_one::<String>(ARG_ADMIN_PASSWORD_SALT)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --admin-password-salt")?;
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .cloned()
            .context("missing required argument: --frontend-base-url")?;

        Ok(Self {
            username,
            password,
            password_salt,
            frontend_base_url,
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(3600),
            session_sweep_seconds: matches
                .get_one::<u64>(ARG_SESSION_SWEEP_SECONDS)
                .copied()
                .unwrap_or(3600),
            login_max_failures: matches
                .get_one::<u32>(ARG_LOGIN_MAX_FAILURES)
                .copied()
                .unwrap_or(5),
            login_window_seconds: matches
                .get_one::<u64>(ARG_LOGIN_WINDOW_SECONDS)
                .copied()
                .unwrap_or(900),
            trust_proxy_headers: matches.get_flag(ARG_TRUST_PROXY_HEADERS),
        })
    }
}
