//! Process configuration resolved from `PANEL_*` environment variables.
//!
//! Every lookup has a non-empty fallback, so a bare environment still yields
//! a usable configuration (a local SQLite file under the default folder).

use std::env;

use url::Url;

use crate::prelude::*;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
  Debug,
  Info,
  Notice,
  Warn,
  Error,
}

impl LogLevel {
  fn parse(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "debug" => Ok(Self::Debug),
      "info" => Ok(Self::Info),
      "notice" => Ok(Self::Notice),
      "warn" | "warning" => Ok(Self::Warn),
      "error" => Ok(Self::Error),
      other => Err(Error::Config(format!("unknown log level `{other}`"))),
    }
  }

  /// Directive understood by `tracing_subscriber::EnvFilter`.
  pub fn as_directive(self) -> &'static str {
    match self {
      Self::Debug => "debug",
      // tracing has no notice level
      Self::Info | Self::Notice => "info",
      Self::Warn => "warn",
      Self::Error => "error",
    }
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  pub debug: bool,
  pub log_level: LogLevel,
  pub database_url: String,
  pub bin_folder: String,
  pub log_folder: String,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Builds the config from an arbitrary key lookup. Empty values count as
  /// unset.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
    let or =
      |key: &str, default: &str| get(key).unwrap_or_else(|| default.into());

    let debug = get("PANEL_DEBUG").as_deref() == Some("true");
    let log_level = if debug {
      LogLevel::Debug
    } else {
      get("PANEL_LOG_LEVEL")
        .map(|level| LogLevel::parse(&level))
        .transpose()?
        .unwrap_or(LogLevel::Info)
    };

    let database_url = if let Some(url) = get("PANEL_DATABASE_URL") {
      url
    } else if let Some(host) = get("PANEL_POSTGRES_HOST") {
      let port = or("PANEL_POSTGRES_PORT", "5432");
      let port = port.parse::<u16>().map_err(|_| {
        Error::Config(format!("invalid PANEL_POSTGRES_PORT `{port}`"))
      })?;

      postgres_url(
        &host,
        port,
        &or("PANEL_POSTGRES_USER", "postgres"),
        get("PANEL_POSTGRES_PASSWORD").as_deref(),
        &or("PANEL_POSTGRES_DB", "panel"),
        &or("PANEL_POSTGRES_SSLMODE", "disable"),
      )?
    } else {
      let folder = or("PANEL_DB_FOLDER", "/etc/panel");
      format!("sqlite:{folder}/{NAME}.db?mode=rwc")
    };

    Ok(Self {
      debug,
      log_level,
      database_url,
      bin_folder: or("PANEL_BIN_FOLDER", "bin"),
      log_folder: or("PANEL_LOG_FOLDER", "/var/log"),
    })
  }
}

/// Assembles a postgres URL, percent-encoding the credentials and database
/// name.
fn postgres_url(
  host: &str,
  port: u16,
  user: &str,
  password: Option<&str>,
  db: &str,
  sslmode: &str,
) -> Result<String> {
  let invalid = |what: &str| Error::Config(format!("invalid postgres {what}"));

  let mut url = Url::parse("postgres://localhost")
    .map_err(|e| Error::Config(e.to_string()))?;
  url.set_host(Some(host)).map_err(|_| invalid("host"))?;
  url.set_port(Some(port)).map_err(|_| invalid("port"))?;
  url.set_username(user).map_err(|_| invalid("user"))?;
  url.set_password(password).map_err(|_| invalid("password"))?;
  url.path_segments_mut().map_err(|_| invalid("database"))?.push(db);
  url.query_pairs_mut().append_pair("sslmode", sslmode);

  Ok(url.into())
}
