use crate::{
    api::{
        self,
        handlers::admin::{AdminConfig, CredentialVerifier, KdfParams},
    },
    cli::telemetry,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub admin_username: String,
    pub admin_password: SecretString,
    pub admin_password_salt: SecretString,
    pub frontend_base_url: String,
    pub session_ttl_seconds: u64,
    pub session_sweep_seconds: u64,
    pub login_max_failures: u32,
    pub login_window_seconds: u64,
    pub trust_proxy_headers: bool,
}

impl Args {
    fn admin_config(&self) -> AdminConfig {
        AdminConfig::new(self.frontend_base_url.clone())
            .with_session_ttl_seconds(self.session_ttl_seconds)
            .with_sweep_interval_seconds(self.session_sweep_seconds)
            .with_max_login_failures(self.login_max_failures)
            .with_login_window_seconds(self.login_window_seconds)
            .with_trust_proxy_headers(self.trust_proxy_headers)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the admin credentials are unusable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let admin_config = args.admin_config();
    debug!(config = ?admin_config, "admin auth configuration");

    let verifier = CredentialVerifier::new(
        args.admin_username,
        &args.admin_password,
        args.admin_password_salt.expose_secret().as_bytes(),
        KdfParams::default(),
    )
    .context("Invalid admin credentials configuration")?;

    if args.dsn.is_none() {
        info!("No database configured, admin audit events go to the log only");
    }

    let result = api::new(args.port, args.dsn, admin_config, verifier).await;
    telemetry::shutdown_tracer();
    result
}
