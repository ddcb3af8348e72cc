// Test utilities shared by unit tests and the integration tests under tests/.
// Always compiled so integration tests can reach them through the library.

pub use tempfile::TempDir;

pub mod chain_builder;
pub mod fixtures;
pub mod mem_store;
pub mod mock_node;

pub use chain_builder::{BlockBuilder, TxBuilder, p2pkh_script, p2sh_script};
pub use fixtures::{IndexFixture, IndexSink};
pub use mem_store::MemStore;
pub use mock_node::{StaticMempool, StaticNode, StaticScriptSolver};

/// A 64-char hex hash made of one repeated digit, e.g. `hash('a')`.
pub fn hash(c: char) -> String {
    std::iter::repeat_n(c, 64).collect()
}
