pub mod keys;
pub mod model;

pub use keys::{derive_address, generate_keypair, sign_payload, verify_signature};
pub use model::Wallet;

/// Balance every address starts from before any transaction history.
pub const STARTING_BALANCE: u64 = 1000;

/// Amount credited to a miner per sealed block.
pub const MINING_REWARD: u64 = 50;

/// Reserved input address marking reward transactions. Recognized
/// structurally, not cryptographically.
pub const MINING_REWARD_INPUT_ADDRESS: &str = "*--official-mining-reward--*";
