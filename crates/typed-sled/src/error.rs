use sled::{
    Error as SledError,
    transaction::{TransactionError, UnabortableTransactionError},
};

use crate::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Codec error
    #[error("Codec Error: {0}")]
    CodecError(#[from] CodecError),

    /// Sled database error
    #[error("Database error: {0}")]
    SledError(#[from] SledError),

    /// Sled transaction error
    #[error("Db transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    /// Error from an operation inside an open transaction. Conflicts must
    /// be propagated back to sled so the transaction is re-run rather
    /// than aborted.
    #[error("Db transaction operation error: {0}")]
    Unabortable(#[from] UnabortableTransactionError),
}

pub type Result<T> = core::result::Result<T, Error>;
