use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("failed to open vault database: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("vault transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("vault table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("vault storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("vault commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record for {key}: {raw:?}")]
    Corrupt { key: String, raw: String },

    #[error("vault is still shared by running tasks")]
    InUse,
}
