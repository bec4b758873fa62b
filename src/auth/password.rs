use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::{debug, error};

/// Argon2id memory cost in KiB (64 MiB).
pub const MEMORY_COST_KIB: u32 = 64 * 1024;
/// Argon2id passes over memory.
pub const TIME_COST: u32 = 3;
/// Argon2id lanes.
pub const PARALLELISM: u32 = 4;

/// Stateless Argon2id password hasher.
///
/// Only the cost parameters used for *new* hashes live here. Verification
/// reads the parameters embedded in the stored PHC string, so a hasher with
/// any cost settings can verify any hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialHasher {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::with_params(MEMORY_COST_KIB, TIME_COST, PARALLELISM)
    }
}

impl CredentialHasher {
    pub const fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }

    /// Hash `plain` with a fresh random salt, returning a PHC string such as
    /// `$argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>`.
    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| {
                error!(error = %e, "argon2 invalid params");
                anyhow::anyhow!(e.to_string())
            })?;
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// True iff `plain` reproduces `hash`. A malformed hash, an unknown
    /// algorithm and a plain mismatch are all reported as `false`.
    pub fn verify(&self, hash: &str, plain: &str) -> bool {
        verify_password(hash, plain)
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    CredentialHasher::default().hash(plain)
}

pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "argon2 parse hash error");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}
