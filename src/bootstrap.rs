//! One-shot "ensure baseline state" pass run before the panel serves traffic.
//!
//! Order: schema sync, default account, then each seeder the ledger has not
//! recorded yet. Any failure aborts the pass and is returned as is.

use crate::{
  crypto::CredentialHasher,
  entity::Table,
  prelude::*,
  schema,
  seed::{self, Seeder},
  sv,
};

/// Outcome of a completed bootstrap pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
  pub default_account_created: bool,
  /// Seeders that ran and were recorded.
  pub applied: Vec<&'static str>,
  /// Seeders recorded without running because there was no legacy data.
  pub marked: Vec<&'static str>,
}

pub struct Bootstrap<'a> {
  db: &'a DatabaseConnection,
  hasher: &'a dyn CredentialHasher,
  seeders: Vec<Box<dyn Seeder>>,
}

impl<'a> Bootstrap<'a> {
  pub fn new(
    db: &'a DatabaseConnection,
    hasher: &'a dyn CredentialHasher,
  ) -> Self {
    Self::with_seeders(db, hasher, seed::builtin())
  }

  pub fn with_seeders(
    db: &'a DatabaseConnection,
    hasher: &'a dyn CredentialHasher,
    seeders: Vec<Box<dyn Seeder>>,
  ) -> Self {
    Self { db, hasher, seeders }
  }

  pub async fn run(&self) -> Result<BootstrapReport> {
    schema::sync(self.db).await?;

    // must be read before the default account exists
    let fresh = sv::is_empty(self.db, Table::Users).await?;

    let mut report = BootstrapReport {
      default_account_created: seed::default_account(self.db, self.hasher)
        .await?
        .is_some(),
      ..Default::default()
    };

    let ledger = sv::Ledger::new(self.db);
    let recorded = ledger.names().await?;

    for seeder in &self.seeders {
      let name = seeder.name();

      if recorded.iter().any(|r| r == name) {
        debug!(seeder = name, "already applied");
        continue;
      }

      if fresh && seeder.legacy_only() {
        ledger.record(name).await?;
        debug!(seeder = name, "nothing to migrate on a fresh store");
        report.marked.push(name);
        continue;
      }

      info!(seeder = name, "running seeder");
      seeder.run(self.db, self.hasher).await?;
      ledger.record(name).await?;
      report.applied.push(name);
    }

    info!(
      default_account = report.default_account_created,
      applied = ?report.applied,
      marked = ?report.marked,
      "bootstrap complete"
    );
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  };

  use async_trait::async_trait;

  use super::*;
  use crate::{
    crypto::Argon2Hasher,
    entity::user,
    seed::{DEFAULT_PASSWORD, DEFAULT_USERNAME, tests::FlakyHasher},
  };

  async fn memory_db() -> DatabaseConnection {
    Database::connect("sqlite::memory:").await.unwrap()
  }

  async fn snapshot(
    db: &DatabaseConnection,
  ) -> (Vec<user::Model>, Vec<String>) {
    (
      sv::Account::new(db).all().await.unwrap(),
      sv::Ledger::new(db).names().await.unwrap(),
    )
  }

  #[tokio::test]
  async fn test_fresh_store() {
    let db = memory_db().await;

    let report = Bootstrap::new(&db, &Argon2Hasher).run().await.unwrap();

    assert!(report.default_account_created);
    assert!(report.applied.is_empty());
    assert_eq!(report.marked, ["UserPasswordHash"]);

    let (users, ledger) = snapshot(&db).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, DEFAULT_USERNAME);
    assert_ne!(users[0].password, DEFAULT_PASSWORD);
    assert_eq!(ledger, ["UserPasswordHash"]);
  }

  #[tokio::test]
  async fn test_legacy_plaintext_store() {
    let db = memory_db().await;
    schema::sync(&db).await.unwrap();
    let accounts = sv::Account::new(&db);
    accounts.create("alice", "wonderland".into()).await.unwrap();
    accounts.create("bob", "builder".into()).await.unwrap();
    let before = accounts.all().await.unwrap();

    let report = Bootstrap::new(&db, &Argon2Hasher).run().await.unwrap();

    assert!(!report.default_account_created);
    assert_eq!(report.applied, ["UserPasswordHash"]);

    let (users, ledger) = snapshot(&db).await;
    assert_eq!(users.len(), before.len());
    for (old, new) in before.iter().zip(&users) {
      assert_eq!(old.username, new.username);
      assert_ne!(old.password, new.password);
      assert!(Argon2Hasher.verify(&old.password, &new.password).unwrap());
    }
    assert_eq!(ledger, ["UserPasswordHash"]);
  }

  #[tokio::test]
  async fn test_second_run_changes_nothing() {
    for legacy in [false, true] {
      let db = memory_db().await;
      if legacy {
        schema::sync(&db).await.unwrap();
        sv::Account::new(&db)
          .create("alice", "wonderland".into())
          .await
          .unwrap();
      }

      Bootstrap::new(&db, &Argon2Hasher).run().await.unwrap();
      let first = snapshot(&db).await;

      let report = Bootstrap::new(&db, &Argon2Hasher).run().await.unwrap();
      let second = snapshot(&db).await;

      assert_eq!(report, BootstrapReport::default());
      assert_eq!(first, second);
    }
  }

  #[tokio::test]
  async fn test_recorded_seeder_is_skipped() {
    let db = memory_db().await;
    schema::sync(&db).await.unwrap();
    sv::Account::new(&db).create("alice", "plain".into()).await.unwrap();
    sv::Ledger::new(&db).record("UserPasswordHash").await.unwrap();

    let report = Bootstrap::new(&db, &Argon2Hasher).run().await.unwrap();

    assert!(report.applied.is_empty());
    let (users, _) = snapshot(&db).await;
    assert_eq!(users[0].password, "plain");
  }

  #[tokio::test]
  async fn test_default_password_hash_failure() {
    let db = memory_db().await;

    let res = Bootstrap::new(&db, &FlakyHasher::new(0)).run().await;

    assert!(matches!(res, Err(Error::Hash(_))));
    let (users, ledger) = snapshot(&db).await;
    assert!(users.is_empty());
    assert!(ledger.is_empty());
  }

  #[tokio::test]
  async fn test_migration_failure_leaves_ledger_unwritten() {
    let db = memory_db().await;
    schema::sync(&db).await.unwrap();
    let accounts = sv::Account::new(&db);
    accounts.create("alice", "wonderland".into()).await.unwrap();
    accounts.create("bob", "builder".into()).await.unwrap();

    let res = Bootstrap::new(&db, &FlakyHasher::new(1)).run().await;
    assert!(matches!(res, Err(Error::Hash(_))));
    assert!(sv::Ledger::new(&db).names().await.unwrap().is_empty());

    let report = Bootstrap::new(&db, &Argon2Hasher).run().await.unwrap();
    assert_eq!(report.applied, ["UserPasswordHash"]);

    let (users, _) = snapshot(&db).await;
    assert!(Argon2Hasher.verify("wonderland", &users[0].password).unwrap());
    assert!(Argon2Hasher.verify("builder", &users[1].password).unwrap());
  }

  #[tokio::test]
  async fn test_fresh_store_with_other_ledger_entries() {
    let db = memory_db().await;
    schema::sync(&db).await.unwrap();
    sv::Ledger::new(&db).record("SettingsDefaults").await.unwrap();

    let report = Bootstrap::new(&db, &Argon2Hasher).run().await.unwrap();

    assert!(report.default_account_created);
    assert!(report.applied.is_empty());
    assert_eq!(report.marked, ["UserPasswordHash"]);

    let (users, ledger) = snapshot(&db).await;
    assert_eq!(ledger, ["SettingsDefaults", "UserPasswordHash"]);
    assert_eq!(users.len(), 1);
    // hashed once at creation, never again
    assert!(Argon2Hasher.verify(DEFAULT_PASSWORD, &users[0].password).unwrap());
  }

  struct Counting {
    name: &'static str,
    legacy_only: bool,
    runs: Arc<AtomicUsize>,
  }

  #[async_trait]
  impl Seeder for Counting {
    fn name(&self) -> &'static str {
      self.name
    }

    fn legacy_only(&self) -> bool {
      self.legacy_only
    }

    async fn run(
      &self,
      _db: &DatabaseConnection,
      _hasher: &dyn CredentialHasher,
    ) -> Result<()> {
      self.runs.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
  }

  #[tokio::test]
  async fn test_seeders_run_in_order_once() {
    let db = memory_db().await;
    let runs = Arc::new(AtomicUsize::new(0));
    let counting = |name, legacy_only| -> Box<dyn Seeder> {
      Box::new(Counting { name, legacy_only, runs: runs.clone() })
    };
    let seeders = || vec![counting("Legacy", true), counting("Always", false)];

    let report = Bootstrap::with_seeders(&db, &Argon2Hasher, seeders())
      .run()
      .await
      .unwrap();

    assert_eq!(report.marked, ["Legacy"]);
    assert_eq!(report.applied, ["Always"]);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(snapshot(&db).await.1, ["Legacy", "Always"]);

    Bootstrap::with_seeders(&db, &Argon2Hasher, seeders())
      .run()
      .await
      .unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }
}
