//! Address index: the stored key layouts and the queries over them.

pub mod keys;
pub mod query;

pub use query::{AddressTxo, get_balance, get_txos};
