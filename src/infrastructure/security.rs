use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand_core::OsRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// Defaults target 50-150ms per hash
pub const DEFAULT_M_COST: u32 = 19456; // 19 MB
pub const DEFAULT_T_COST: u32 = 2;
pub const DEFAULT_P_COST: u32 = 1;

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            m_cost: DEFAULT_M_COST,
            t_cost: DEFAULT_T_COST,
            p_cost: DEFAULT_P_COST,
        }
    }
}

impl HashingParams {
    /// Smallest parameters argon2 accepts. Only for tests.
    pub fn minimal() -> Self {
        Self {
            m_cost: Params::MIN_M_COST,
            t_cost: Params::MIN_T_COST,
            p_cost: Params::MIN_P_COST,
        }
    }
}

/// Argon2id hasher producing PHC strings. Clones share one verification count.
#[derive(Clone)]
pub struct PasswordHashing {
    argon2: Argon2<'static>,
    verifications: Arc<AtomicU64>,
}

impl PasswordHashing {
    pub fn new(params: HashingParams) -> Result<Self, password_hash::Error> {
        let params = Params::new(params.m_cost, params.t_cost, params.p_cost, None)
            .map_err(password_hash::Error::from)?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            verifications: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String, password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, password_hash::Error> {
        let parsed = PasswordHash::new(hash)?;
        self.verifications.fetch_add(1, Ordering::Relaxed);
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Number of password checks run through this hasher and its clones.
    pub fn verifications(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }
}
