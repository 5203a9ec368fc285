//! Error type for `unimatch-store-sqlite`.

use rusqlite::ffi;
use thiserror::Error;
use unimatch_core::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] unimatch_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column could not be decoded into its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

impl StoreError for Error {
  /// `true` for `UNIQUE` and `PRIMARY KEY` violations only; foreign-key and
  /// `CHECK` failures are real errors.
  fn is_conflict(&self) -> bool {
    let Error::Database(tokio_rusqlite::Error::Rusqlite(
      rusqlite::Error::SqliteFailure(e, _),
    )) = self
    else {
      return false;
    };
    e.code == rusqlite::ErrorCode::ConstraintViolation
      && matches!(
        e.extended_code,
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
      )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
