//! Error types for storage bootstrap

use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Connection error: {0}")]
  Connection(#[source] DbErr),

  #[error("Schema error on `{table}`: {reason}")]
  Schema { table: &'static str, reason: String },

  #[error("Query error: {0}")]
  Query(#[from] DbErr),

  #[error("Hash error: {0}")]
  Hash(String),

  #[error("Close error: {0}")]
  Close(#[source] DbErr),

  #[error("Config error: {0}")]
  Config(String),
}

impl Error {
  pub(crate) fn schema(table: &'static str, reason: impl ToString) -> Self {
    Self::Schema { table, reason: reason.to_string() }
  }

  /// True when a lookup failed only because the record does not exist.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::Query(DbErr::RecordNotFound(_)))
  }
}

pub type Result<T> = std::result::Result<T, Error>;
