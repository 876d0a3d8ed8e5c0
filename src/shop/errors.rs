use thiserror::Error;

/// Errors that can arise in the shop storage and currency layers.
#[derive(Debug, Error)]
pub enum ShopError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// A multi-tree sled transaction failed to commit.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The currency-item text codec rejected a value.
    #[error("currency codec error: {0}")]
    CurrencyCodec(#[from] serde_json::Error),

    /// The database was written by a newer release than this build knows.
    /// Fatal at startup: running against a misunderstood schema is worse
    /// than refusing to run.
    #[error("database schema v{found} is newer than supported v{supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    /// A custom currency with this name is already registered.
    #[error("currency '{0}' already exists")]
    CurrencyExists(String),
}
