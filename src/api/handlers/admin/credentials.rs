//! Admin credential verification.
//!
//! The configured password is stretched once with Argon2id under a fixed salt
//! and only the digest is kept. Every login attempt runs the same derivation on
//! the submitted password and compares digests with `subtle`, so the comparison
//! time does not depend on where the inputs first differ.

use anyhow::{Result, anyhow};
use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::error;

const DIGEST_LEN: usize = 32;
const MIN_SALT_LEN: usize = 8;

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    fn argon2(self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(DIGEST_LEN),
        )
        .map_err(|err| anyhow!("invalid Argon2id parameters: {err}"))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

pub struct CredentialVerifier {
    username: String,
    salt: Vec<u8>,
    argon2: Argon2<'static>,
    expected: [u8; DIGEST_LEN],
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("username", &self.username)
            .field("expected", &"***")
            .finish_non_exhaustive()
    }
}

impl CredentialVerifier {
    /// Derive the digest of the configured admin password.
    ///
    /// # Errors
    /// Returns an error if the username or password is empty, the salt is shorter
    /// than 8 bytes, or the KDF parameters are rejected.
    pub fn new(
        username: String,
        password: &SecretString,
        salt: &[u8],
        params: KdfParams,
    ) -> Result<Self> {
        if username.is_empty() {
            return Err(anyhow!("admin username must not be empty"));
        }
        if password.expose_secret().is_empty() {
            return Err(anyhow!("admin password must not be empty"));
        }
        if salt.len() < MIN_SALT_LEN {
            return Err(anyhow!(
                "admin password salt must be at least {MIN_SALT_LEN} bytes"
            ));
        }

        let argon2 = params.argon2()?;
        let mut expected = [0u8; DIGEST_LEN];
        argon2
            .hash_password_into(password.expose_secret().as_bytes(), salt, &mut expected)
            .map_err(|err| anyhow!("failed to derive admin password digest: {err}"))?;

        Ok(Self {
            username,
            salt: salt.to_vec(),
            argon2,
            expected,
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Check submitted credentials against the configured admin.
    ///
    /// Empty inputs never match. The password digest is always derived, even for
    /// an unknown username, so both failure kinds cost the same.
    #[must_use]
    pub fn verify(&self, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            return false;
        }

        let Some(submitted) = self.digest(password) else {
            return false;
        };
        let password_matches: bool = submitted[..].ct_eq(&self.expected[..]).into();
        let username_matches = username == self.username;

        password_matches & username_matches
    }

    fn digest(&self, password: &str) -> Option<[u8; DIGEST_LEN]> {
        let mut out = [0u8; DIGEST_LEN];
        match self
            .argon2
            .hash_password_into(password.as_bytes(), &self.salt, &mut out)
        {
            Ok(()) => Some(out),
            Err(err) => {
                error!("Failed to derive submitted password digest: {err}");
                None
            }
        }
    }
}
