//! The crate-wide error type (§7).
//!
//! Every failure mode the query builder and the Bolt transport can produce is
//! a variant of this one enum, mirroring the single flat `Error` style used
//! throughout the pack this crate was grown from.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // --- query builder ---
    #[error("alias '{0}' is declared more than once with conflicting meaning")]
    AliasConflict(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("unknown alias '{0}' referenced in query")]
    UnknownAlias(String),

    #[error("cannot infer an alias for an implicit WHERE map: no pattern has introduced one yet")]
    CannotInferAlias,

    #[error("mid-transaction failure aborted the transaction: {0}")]
    TransactionAborted(String),

    #[error("pool acquire timed out after {0:?}")]
    AcquireTimeout(std::time::Duration),

    // --- configuration / URLs ---
    #[error("invalid driver URL '{0}': {1}")]
    InvalidUrl(String, String),

    #[error("no endpoint configured for db_key '{0}'")]
    UnknownDbKey(String),

    #[error("invalid configuration: {0}")]
    ConfigError(String),

    // --- Bolt transport ---
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("server does not support a compatible Bolt protocol version")]
    UnsupportedVersion,

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("packstream decode error: {0}")]
    PackStreamError(String),

    #[error("connection pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },

    #[error("connection pool is closed")]
    PoolClosed,

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("server returned failure {code}: {message}")]
    ServerFailure { code: String, message: String },

    #[error("transaction error: {0}")]
    TransactionError(String),

    #[error("tls error: {0}")]
    Tls(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
