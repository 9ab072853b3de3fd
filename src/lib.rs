//! Panel storage bootstrap
//!
//! Architecture:
//! - SeaORM entities for the panel tables (SQLite or PostgreSQL)
//! - Additive schema synchronisation from the entity definitions
//! - Default account and ledger-guarded one-time seeders
//! - Argon2 password hashing

pub mod bootstrap;
pub mod config;
pub mod crypto;
pub mod entity;
pub mod error;
pub mod prelude;
pub mod schema;
pub mod seed;
pub mod storage;
pub mod sv;

pub use bootstrap::{Bootstrap, BootstrapReport};
pub use config::Config;
pub use crypto::{Argon2Hasher, CredentialHasher};
pub use error::{Error, Result};
pub use storage::Storage;
