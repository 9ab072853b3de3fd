//! Password hashing.

use argon2::{
  Argon2,
  password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    rand_core::OsRng,
  },
};

use crate::prelude::*;

/// One-way password hashing used by the seeders and by login.
pub trait CredentialHasher: Send + Sync {
  fn hash(&self, password: &str) -> Result<String>;

  fn verify(&self, password: &str, hash: &str) -> Result<bool>;

  /// Whether `value` already is output of [`CredentialHasher::hash`].
  fn is_hashed(&self, value: &str) -> bool;
}

/// Argon2id with the crate's default parameters, PHC string output.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
  fn hash(&self, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| Error::Hash(e.to_string()))?;
    Ok(hash.to_string())
  }

  fn verify(&self, password: &str, hash: &str) -> Result<bool> {
    let parsed =
      PasswordHash::new(hash).map_err(|e| Error::Hash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
      Ok(()) => Ok(true),
      Err(argon2::password_hash::Error::Password) => Ok(false),
      Err(e) => Err(Error::Hash(e.to_string())),
    }
  }

  fn is_hashed(&self, value: &str) -> bool {
    PasswordHash::new(value)
      .map(|hash| hash.algorithm.as_str().starts_with("argon2"))
      .unwrap_or(false)
  }
}
