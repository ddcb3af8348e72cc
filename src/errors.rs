use thiserror::Error;

/// Errors surfaced by the query and classification core.
///
/// Malformed crypto/codec inputs never reach this type: those helpers return
/// empty results instead. `MalformedInput` here is reserved for stored values
/// that fail their fixed-layout decode.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// A stored or supplied value does not match its documented layout
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A lookup that callers treat as a normal branch (missing tx, missing marker)
    #[error("not found: {0}")]
    NotFound(String),

    /// The range iterator finished in a non-ok status
    #[error("store scan failed: {0}")]
    StoreScan(String),

    /// Point lookup or write failure from RocksDB
    #[error("store error: {0}")]
    Store(#[from] rocksdb::Error),

    /// Node JSON-RPC failure (transport or node-reported)
    #[error("rpc error {code}: {message}")]
    Rpc { code: i32, message: String },
}

pub type Result<T> = std::result::Result<T, IndexerError>;
