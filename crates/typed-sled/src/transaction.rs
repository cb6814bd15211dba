use std::{fmt::Debug, time::Duration};

use sled::{
    Transactional,
    transaction::{ConflictableTransactionResult, TransactionError, TransactionResult},
};

use crate::{Schema, SledTree, tree::SledTransactionalTree};

/// Delay policy between retries of a failed transaction.
pub trait Backoff: Debug + Send + Sync {
    /// Delay to apply before the given retry attempt (starting at 0).
    fn delay(&self, attempt: u16) -> Duration;
}

/// Fixed delay between retries.
#[derive(Debug, Clone)]
pub struct ConstantBackoff {
    delay_ms: u64,
}

impl ConstantBackoff {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms }
    }
}

impl Backoff for ConstantBackoff {
    fn delay(&self, _attempt: u16) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Trait for performing transactions on typed sled trees.
///
/// Implemented for tuples of `&SledTree<S>` so multiple tables can be
/// mutated atomically. sled re-runs the closure on write conflicts by
/// itself; `transaction_with_retry` additionally retries transient
/// storage failures, while aborts carrying a caller error are returned
/// immediately.
pub trait SledTransactional {
    type View;

    /// Executes a function within a transaction context.
    fn transaction<F, R, E>(&self, func: F) -> TransactionResult<R, E>
    where
        F: Fn(Self::View) -> ConflictableTransactionResult<R, E>;

    /// Executes a function within a transaction context, retrying
    /// transient storage failures with the given backoff.
    fn transaction_with_retry<F, R, E>(
        &self,
        backoff: &dyn Backoff,
        retry_count: u16,
        func: F,
    ) -> TransactionResult<R, E>
    where
        F: Fn(Self::View) -> ConflictableTransactionResult<R, E>,
    {
        let mut attempt: u16 = 0;
        loop {
            match self.transaction(&func) {
                Ok(res) => return Ok(res),
                Err(TransactionError::Abort(e)) => return Err(TransactionError::Abort(e)),
                Err(TransactionError::Storage(e)) => {
                    if attempt >= retry_count {
                        return Err(TransactionError::Storage(e));
                    }
                    std::thread::sleep(backoff.delay(attempt));
                    attempt += 1;
                }
            }
        }
    }
}

macro_rules! impl_sled_transactional {
    ($(($idx:tt, $schema:ident, $var:ident)),+) => {
        impl<'t, $($schema: Schema),+> SledTransactional for ($(&'t SledTree<$schema>),+,) {
            type View = ($(SledTransactionalTree<$schema>),+,);

            fn transaction<F, R, E>(&self, func: F) -> TransactionResult<R, E>
            where
                F: Fn(Self::View) -> ConflictableTransactionResult<R, E>,
            {
                ($(&*self.$idx.inner),+,).transaction(|($($var),+,)| {
                    func(($(SledTransactionalTree::<$schema>::new($var.clone())),+,))
                })
            }
        }
    };
}

impl_sled_transactional!((0, S0, t0));
impl_sled_transactional!((0, S0, t0), (1, S1, t1));
impl_sled_transactional!((0, S0, t0), (1, S1, t1), (2, S2, t2));
