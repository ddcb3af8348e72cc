pub mod address;
pub mod bitcoind_flexible;
pub mod config;
pub mod consts;
pub mod crypto;
pub mod errors;
pub mod index;
pub mod protocols;
pub mod runtime;
pub mod server;
pub mod utils;

// Test utilities available for testing
// Always compiled to support both unit tests and integration tests
pub mod test_utils;
