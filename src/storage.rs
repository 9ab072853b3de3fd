//! Owned handle to the panel's database connection.

use std::{
  io::{self, Read},
  path::Path,
};

use sea_orm::{ConnectOptions, Statement};

use crate::{
  bootstrap::{Bootstrap, BootstrapReport},
  config::Config,
  crypto::CredentialHasher,
  prelude::*,
};

const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// The live connection. Opened once at startup and consumed by
/// [`Storage::close`] at shutdown; everything else borrows it.
pub struct Storage {
  db: DatabaseConnection,
}

impl Storage {
  pub async fn open(config: &Config) -> Result<Self> {
    let mut opts = ConnectOptions::new(config.database_url.clone());
    opts.sqlx_logging(config.debug);

    info!("Connecting to database...");
    let db = Database::connect(opts).await.map_err(Error::Connection)?;
    Ok(Self { db })
  }

  /// Opens the store and brings it to its baseline state. The connection is
  /// released again if the bootstrap pass fails.
  pub async fn initialize(
    config: &Config,
    hasher: &dyn CredentialHasher,
  ) -> Result<(Self, BootstrapReport)> {
    let storage = Self::open(config).await?;

    let result = Bootstrap::new(&storage.db, hasher).run().await;
    match result {
      Ok(report) => Ok((storage, report)),
      Err(err) => {
        if let Err(close) = storage.close().await {
          warn!("Failed to close database after bootstrap error: {}", close);
        }
        Err(err)
      }
    }
  }

  pub fn conn(&self) -> &DatabaseConnection {
    &self.db
  }

  pub async fn close(self) -> Result<()> {
    self.db.close().await.map_err(Error::Close)?;
    info!("Database closed");
    Ok(())
  }

  /// Checkpoints, then closes. A failed checkpoint is logged and does not
  /// keep the connection open.
  pub async fn shutdown(self) -> Result<()> {
    if let Err(err) = self.checkpoint().await {
      warn!("Checkpoint failed: {}", err);
    }
    self.close().await
  }

  /// Folds the SQLite write-ahead log back into the main file. Other
  /// backends have nothing to do.
  pub async fn checkpoint(&self) -> Result<()> {
    if self.db.get_database_backend() != DbBackend::Sqlite {
      return Ok(());
    }

    self
      .db
      .execute(Statement::from_string(
        DbBackend::Sqlite,
        "PRAGMA wal_checkpoint",
      ))
      .await?;
    Ok(())
  }

  /// Writes a consistent copy of a SQLite store to `path`.
  pub async fn backup(&self, path: &Path) -> Result<()> {
    let backend = self.db.get_database_backend();
    if backend != DbBackend::Sqlite {
      return Err(Error::Config(format!(
        "backups are only supported for sqlite, not {backend:?}"
      )));
    }

    let target = path.to_string_lossy().replace('\'', "''");
    self
      .db
      .execute(Statement::from_string(
        DbBackend::Sqlite,
        format!("VACUUM INTO '{target}'"),
      ))
      .await?;

    debug!(path = %path.display(), "database backup written");
    Ok(())
  }
}

/// Whether `reader` starts with the SQLite file header.
pub fn is_sqlite_file(mut reader: impl Read) -> io::Result<bool> {
  let mut header = [0u8; 16];
  match reader.read_exact(&mut header) {
    Ok(()) => Ok(&header == SQLITE_HEADER),
    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
    Err(e) => Err(e),
  }
}
