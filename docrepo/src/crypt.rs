//! Password hashing.
//!
//! [`PasswordCrypt`] is the hashing collaborator repositories of user accounts depend on.
//! [`Argon2Crypt`] implements it with Argon2id and PHC-formatted hash strings, and
//! [`BcryptCrypt`] with bcrypt (`$2b$...`) for stores whose existing accounts were hashed
//! that way. The two formats do not verify each other's hashes.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptError {
    #[error("Failed to hash password: {0}")]
    Hash(String),
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),
    #[error("Password does not match")]
    Mismatch,
}

pub type CryptResult<T> = Result<T, CryptError>;

/// Generates and checks password hashes.
pub trait PasswordCrypt: Send + Sync {
    /// Hashes `plain` with a fresh salt.
    fn generate_password(&self, plain: &str) -> CryptResult<String>;

    /// Returns `Ok(())` if `plain` matches `hashed`, [`CryptError::Mismatch`] if it does not.
    fn compare_password(&self, hashed: &str, plain: &str) -> CryptResult<()>;
}

/// Argon2id password hashing.
///
/// `Argon2Crypt::default()` uses the argon2 crate's recommended parameters
/// (19 MiB memory, 2 iterations, 1 lane).
#[derive(Debug, Clone, Default)]
pub struct Argon2Crypt {
    argon2: Argon2<'static>,
}

impl Argon2Crypt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses Argon2id with custom cost parameters.
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl PasswordCrypt for Argon2Crypt {
    fn generate_password(&self, plain: &str) -> CryptResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CryptError::Hash(e.to_string()))
    }

    fn compare_password(&self, hashed: &str, plain: &str) -> CryptResult<()> {
        let parsed = PasswordHash::new(hashed).map_err(|e| CryptError::InvalidHash(e.to_string()))?;

        match self.argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(password_hash::Error::Password) => Err(CryptError::Mismatch),
            Err(e) => Err(CryptError::InvalidHash(e.to_string())),
        }
    }
}

/// bcrypt password hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcryptCrypt {
    cost: u32,
}

impl BcryptCrypt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `cost` rounds (log2). bcrypt accepts 4 to 31.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptCrypt {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordCrypt for BcryptCrypt {
    fn generate_password(&self, plain: &str) -> CryptResult<String> {
        bcrypt::hash(plain, self.cost).map_err(|e| CryptError::Hash(e.to_string()))
    }

    fn compare_password(&self, hashed: &str, plain: &str) -> CryptResult<()> {
        match bcrypt::verify(plain, hashed) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CryptError::Mismatch),
            Err(e) => Err(CryptError::InvalidHash(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cheap parameters, tests only.
    fn crypt() -> Argon2Crypt {
        Argon2Crypt::with_params(Params::new(1024, 1, 1, None).unwrap())
    }

    #[test]
    fn test_generate_and_compare() {
        let crypt = crypt();
        let hashed = crypt.generate_password("secret").unwrap();

        assert!(hashed.starts_with("$argon2id$"));
        assert_ne!(hashed, "secret");
        assert_eq!(crypt.compare_password(&hashed, "secret"), Ok(()));
        assert_eq!(crypt.compare_password(&hashed, "Secret"), Err(CryptError::Mismatch));
    }

    #[test]
    fn test_salts_differ() {
        let crypt = crypt();

        assert_ne!(
            crypt.generate_password("secret").unwrap(),
            crypt.generate_password("secret").unwrap()
        );
    }

    #[test]
    fn test_invalid_hash() {
        assert!(matches!(
            crypt().compare_password("not a hash", "secret"),
            Err(CryptError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_hashes_verify_across_parameters() {
        let hashed = crypt().generate_password("secret").unwrap();

        // Parameters are read from the PHC string, not the verifier.
        assert_eq!(Argon2Crypt::new().compare_password(&hashed, "secret"), Ok(()));
    }

    #[test]
    fn test_bcrypt_generate_and_compare() {
        let crypt = BcryptCrypt::with_cost(4);
        let hashed = crypt.generate_password("secret").unwrap();

        assert!(hashed.starts_with("$2"));
        assert_eq!(crypt.compare_password(&hashed, "secret"), Ok(()));
        assert_eq!(crypt.compare_password(&hashed, "Secret"), Err(CryptError::Mismatch));
    }

    #[test]
    fn test_bcrypt_rejects_invalid_cost_and_hash() {
        assert!(matches!(
            BcryptCrypt::with_cost(2).generate_password("secret"),
            Err(CryptError::Hash(_))
        ));
        assert!(matches!(
            BcryptCrypt::new().compare_password("not a hash", "secret"),
            Err(CryptError::InvalidHash(_))
        ));
        assert_eq!(BcryptCrypt::new().cost(), bcrypt::DEFAULT_COST);
    }

    #[test]
    fn test_formats_are_not_interchangeable() {
        let bcrypt_hash = BcryptCrypt::with_cost(4).generate_password("secret").unwrap();

        assert!(matches!(
            crypt().compare_password(&bcrypt_hash, "secret"),
            Err(CryptError::InvalidHash(_))
        ));
    }
}
