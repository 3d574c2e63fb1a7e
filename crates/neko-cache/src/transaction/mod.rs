//! `MULTI`/`EXEC` transactions over a single reserved connection.

mod scoped;

pub use scoped::{op, queue, Transaction, TransactionOp, TransactionState};
