//! Error type for `schemata-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column holds a value the record type cannot represent.
  #[error("corrupt record {id:?}: {message}")]
  Decode { id: String, message: String },

  /// The row vanished between a committed write and its read-back.
  #[error("record {0:?} missing after a committed write")]
  MissingAfterWrite(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
