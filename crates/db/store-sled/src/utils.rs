use sled::transaction::{ConflictableTransactionError, TransactionError};
use strata_taskdb_types::DbError;
use typed_sled::error::Error;

/// Collapses the result of a finished transaction into a [`DbError`].
pub(crate) fn to_db_error(err: TransactionError<DbError>) -> DbError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => DbError::TransactionError(e.to_string()),
    }
}

/// Maps a typed-sled error raised by an operation inside an open
/// transaction. Conflicts and storage faults are handed back to sled so
/// the transaction machinery can re-run or surface them; anything else
/// aborts with a domain error.
pub(crate) fn tx_op_error(err: Error) -> ConflictableTransactionError<DbError> {
    match err {
        Error::Unabortable(u) => u.into(),
        other => ConflictableTransactionError::Abort(DbError::from(other)),
    }
}

/// Aborts the transaction with a domain error.
pub(crate) fn abort_with(err: impl Into<DbError>) -> ConflictableTransactionError<DbError> {
    ConflictableTransactionError::Abort(err.into())
}
