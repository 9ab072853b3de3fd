//! Baseline data: the default account and one-time data seeders.

use async_trait::async_trait;

use crate::{
  crypto::CredentialHasher,
  entity::{Table, user},
  prelude::*,
  sv,
};

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";

/// Creates the default account when the account table is empty. Returns the
/// new account, or `None` when accounts already exist.
pub async fn default_account(
  db: &DatabaseConnection,
  hasher: &dyn CredentialHasher,
) -> Result<Option<user::Model>> {
  if !sv::is_empty(db, Table::Users).await? {
    return Ok(None);
  }

  let password = hasher.hash(DEFAULT_PASSWORD)?;
  let user = sv::Account::new(db).create(DEFAULT_USERNAME, password).await?;

  info!(username = %user.username, "default account created");
  Ok(Some(user))
}

/// A named one-time data migration. The ledger records its name once it has
/// completed, after which it never runs again.
#[async_trait]
pub trait Seeder: Send + Sync {
  fn name(&self) -> &'static str;

  /// Seeders that only rewrite pre-existing data are recorded without running
  /// on a store that had no accounts before this bootstrap pass.
  fn legacy_only(&self) -> bool {
    true
  }

  async fn run(
    &self,
    db: &DatabaseConnection,
    hasher: &dyn CredentialHasher,
  ) -> Result<()>;
}

/// Seeders in the order they must run.
pub fn builtin() -> Vec<Box<dyn Seeder>> {
  vec![Box::new(UserPasswordHash)]
}

/// Replaces plaintext account passwords with hashes.
pub struct UserPasswordHash;

#[async_trait]
impl Seeder for UserPasswordHash {
  fn name(&self) -> &'static str {
    "UserPasswordHash"
  }

  async fn run(
    &self,
    db: &DatabaseConnection,
    hasher: &dyn CredentialHasher,
  ) -> Result<()> {
    let accounts = sv::Account::new(db);
    let mut rehashed = 0usize;

    for user in accounts.all().await? {
      // left over from an interrupted earlier run
      if hasher.is_hashed(&user.password) {
        debug!(username = %user.username, "password already hashed");
        continue;
      }

      let hash = hasher.hash(&user.password)?;
      accounts.set_password(user, hash).await?;
      rehashed += 1;
    }

    info!(rehashed, "account passwords hashed");
    Ok(())
  }
}
