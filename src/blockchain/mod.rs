pub mod block;
pub mod model;

pub use block::Block;
pub use model::Blockchain;

/// Default Proof-of-Work difficulty (leading zero hex characters).
pub const DEFAULT_DIFFICULTY: u32 = 3;

/// Target seconds between blocks; difficulty adjusts around this rate.
pub const MINE_RATE_SECS: f64 = 8.0;

/// Fixed genesis fields, identical on every node.
pub const GENESIS_TIMESTAMP: f64 = 0.0;
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";
pub const GENESIS_NONCE: u64 = 0;
pub const GENESIS_MESSAGE: &str = "Welcome to D8A Coin";
