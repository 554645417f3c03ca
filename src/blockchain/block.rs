use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    DEFAULT_DIFFICULTY, GENESIS_MESSAGE, GENESIS_NONCE, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP,
    MINE_RATE_SECS,
};
use crate::error::ValidationError;
use crate::util::{crypto_hash, now_timestamp};

/// The genesis block is fixed across all nodes; its hash is computed once
/// per process from the shared constants.
static GENESIS: LazyLock<Block> = LazyLock::new(|| {
    let data = json!({ "message": GENESIS_MESSAGE });
    let hash = Block::calculate_hash(
        0,
        GENESIS_TIMESTAMP,
        &data,
        GENESIS_PREVIOUS_HASH,
        GENESIS_NONCE,
        DEFAULT_DIFFICULTY,
    );
    Block {
        index: 0,
        timestamp: GENESIS_TIMESTAMP,
        data,
        previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        nonce: GENESIS_NONCE,
        difficulty: DEFAULT_DIFFICULTY,
        hash,
    }
});

/// A single block in the chain. Immutable once constructed; new blocks come
/// from mining or from a validated peer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64, // fractional seconds since the Unix epoch
    pub data: Value,
    pub previous_hash: String,
    pub nonce: u64,
    pub difficulty: u32,
    pub hash: String,
}

impl Block {
    /// Return the hard-coded genesis block.
    pub fn genesis() -> Self {
        GENESIS.clone()
    }

    /// SHA-256 hash over all block fields except the hash itself.
    /// Deterministic: `data` is canonicalized before hashing.
    pub fn calculate_hash(
        index: u64,
        timestamp: f64,
        data: &Value,
        previous_hash: &str,
        nonce: u64,
        difficulty: u32,
    ) -> String {
        crypto_hash(&[
            json!(index),
            json!(timestamp),
            data.clone(),
            json!(previous_hash),
            json!(nonce),
            json!(difficulty),
        ])
    }

    /// Mine the next block on top of `last_block` using wall-clock time.
    pub fn mine_block(last_block: &Block, data: Value) -> Block {
        Self::mine_block_with(last_block, data, None, now_timestamp)
    }

    /// Mine with an injectable timestamp provider and optional fixed
    /// difficulty. Each attempt resamples the timestamp and (unless
    /// overridden) re-derives difficulty, so a long search adapts downward.
    /// Blocks until a hash with enough leading zeros is found.
    pub fn mine_block_with<F>(
        last_block: &Block,
        data: Value,
        difficulty_override: Option<u32>,
        timestamp_provider: F,
    ) -> Block
    where
        F: Fn() -> f64,
    {
        mine_loop(last_block, data, difficulty_override, None, timestamp_provider)
            .expect("mining without a cancel token always completes")
    }

    /// Cancellable variant of mining: checks `cancel` on every attempt and
    /// returns `None` once it is set, so a concurrent caller can abort a
    /// stale attempt when a better chain arrives.
    pub fn mine_block_until_cancelled<F>(
        last_block: &Block,
        data: Value,
        cancel: &AtomicBool,
        timestamp_provider: F,
    ) -> Option<Block>
    where
        F: Fn() -> f64,
    {
        mine_loop(last_block, data, None, Some(cancel), timestamp_provider)
    }

    /// Adjust difficulty relative to how quickly the previous block was
    /// followed. Looks only at the immediately preceding interval.
    pub fn adjust_difficulty(last_block: &Block, new_timestamp: f64) -> u32 {
        if new_timestamp - last_block.timestamp < MINE_RATE_SECS {
            last_block.difficulty + 1
        } else {
            last_block.difficulty.saturating_sub(1).max(1)
        }
    }

    /// Validate a candidate block relative to its predecessor.
    pub fn is_valid_block(last_block: &Block, block: &Block) -> Result<(), ValidationError> {
        if block.previous_hash != last_block.hash {
            return Err(ValidationError::BrokenHashLink);
        }

        if block.index != last_block.index + 1 {
            return Err(ValidationError::IndexGap);
        }

        if !meets_difficulty(&block.hash, block.difficulty) {
            return Err(ValidationError::InsufficientWork);
        }

        if block.difficulty.abs_diff(last_block.difficulty) > 1 {
            return Err(ValidationError::DifficultyJump);
        }

        let reconstructed = Block::calculate_hash(
            block.index,
            block.timestamp,
            &block.data,
            &block.previous_hash,
            block.nonce,
            block.difficulty,
        );
        if block.hash != reconstructed {
            return Err(ValidationError::HashMismatch);
        }

        Ok(())
    }
}

/// True when the hex hash carries at least `difficulty` leading zeros.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    hash.len() >= difficulty as usize
        && hash.chars().take(difficulty as usize).all(|c| c == '0')
}

fn mine_loop<F>(
    last_block: &Block,
    data: Value,
    difficulty_override: Option<u32>,
    cancel: Option<&AtomicBool>,
    timestamp_provider: F,
) -> Option<Block>
where
    F: Fn() -> f64,
{
    let index = last_block.index + 1;
    let mut nonce: u64 = 0;

    loop {
        if let Some(token) = cancel {
            if token.load(Ordering::Relaxed) {
                return None;
            }
        }

        let timestamp = timestamp_provider();
        let difficulty = difficulty_override
            .unwrap_or_else(|| Block::adjust_difficulty(last_block, timestamp));
        let hash = Block::calculate_hash(
            index,
            timestamp,
            &data,
            &last_block.hash,
            nonce,
            difficulty,
        );

        if meets_difficulty(&hash, difficulty) {
            return Some(Block {
                index,
                timestamp,
                data,
                previous_hash: last_block.hash.clone(),
                nonce,
                difficulty,
                hash,
            });
        }

        nonce = nonce.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Timestamp provider that mines slower than the target rate, so
    /// difficulty trends down and tests stay fast.
    fn slow_clock(last_block: &Block) -> impl Fn() -> f64 {
        let base = last_block.timestamp + MINE_RATE_SECS * 2.0;
        move || base
    }

    #[test]
    fn genesis_matches_constants() {
        let genesis = Block::genesis();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.timestamp, GENESIS_TIMESTAMP);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.nonce, GENESIS_NONCE);
        assert_eq!(genesis.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(
            genesis.hash,
            Block::calculate_hash(
                genesis.index,
                genesis.timestamp,
                &genesis.data,
                &genesis.previous_hash,
                genesis.nonce,
                genesis.difficulty,
            )
        );
    }

    #[test]
    fn genesis_is_stable_across_calls() {
        assert_eq!(Block::genesis(), Block::genesis());
    }

    #[test]
    fn mined_block_satisfies_validation() {
        let genesis = Block::genesis();
        let block =
            Block::mine_block_with(&genesis, json!("payload"), None, slow_clock(&genesis));

        assert!(meets_difficulty(&block.hash, block.difficulty));
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, genesis.hash);
        assert!(Block::is_valid_block(&genesis, &block).is_ok());
    }

    #[test]
    fn mining_respects_difficulty_override() {
        let genesis = Block::genesis();
        let block =
            Block::mine_block_with(&genesis, json!("payload"), Some(1), slow_clock(&genesis));
        assert_eq!(block.difficulty, 1);
        assert!(block.hash.starts_with('0'));
    }

    #[test]
    fn cancelled_mining_returns_none() {
        let genesis = Block::genesis();
        let cancel = AtomicBool::new(true);
        let result = Block::mine_block_until_cancelled(
            &genesis,
            json!("payload"),
            &cancel,
            slow_clock(&genesis),
        );
        assert!(result.is_none());
    }

    #[test]
    fn uncancelled_mining_completes() {
        let genesis = Block::genesis();
        let cancel = AtomicBool::new(false);
        let block = Block::mine_block_until_cancelled(
            &genesis,
            json!("payload"),
            &cancel,
            slow_clock(&genesis),
        )
        .expect("no cancellation requested");
        assert!(Block::is_valid_block(&genesis, &block).is_ok());
    }

    #[test]
    fn quick_block_raises_difficulty() {
        let genesis = Block::genesis();
        let quickly = genesis.timestamp + MINE_RATE_SECS / 2.0;
        assert_eq!(
            Block::adjust_difficulty(&genesis, quickly),
            genesis.difficulty + 1
        );
    }

    #[test]
    fn slow_block_lowers_difficulty() {
        let genesis = Block::genesis();
        let slowly = genesis.timestamp + MINE_RATE_SECS * 2.0;
        assert_eq!(
            Block::adjust_difficulty(&genesis, slowly),
            genesis.difficulty - 1
        );
    }

    #[test]
    fn difficulty_never_drops_below_one() {
        let mut block = Block::genesis();
        block.difficulty = 1;
        let slowly = block.timestamp + MINE_RATE_SECS * 2.0;
        assert_eq!(Block::adjust_difficulty(&block, slowly), 1);
    }

    #[test]
    fn tampered_previous_hash_is_rejected() {
        let genesis = Block::genesis();
        let mut block = Block::mine_block_with(&genesis, json!("x"), None, slow_clock(&genesis));
        block.previous_hash = "evil".to_string();
        assert_eq!(
            Block::is_valid_block(&genesis, &block),
            Err(ValidationError::BrokenHashLink)
        );
    }

    #[test]
    fn tampered_index_is_rejected() {
        let genesis = Block::genesis();
        let mut block = Block::mine_block_with(&genesis, json!("x"), None, slow_clock(&genesis));
        block.index += 1;
        assert_eq!(
            Block::is_valid_block(&genesis, &block),
            Err(ValidationError::IndexGap)
        );
    }

    #[test]
    fn insufficient_work_is_rejected() {
        let genesis = Block::genesis();
        let mut block = Block::mine_block_with(&genesis, json!("x"), None, slow_clock(&genesis));
        // A hash with no leading zeros cannot satisfy any difficulty >= 1.
        block.hash = "f".repeat(64);
        assert_eq!(
            Block::is_valid_block(&genesis, &block),
            Err(ValidationError::InsufficientWork)
        );
    }

    #[test]
    fn difficulty_jump_is_rejected() {
        // Genesis sits at difficulty 3; a candidate at 1 jumps by two even
        // though its (easier) proof-of-work checks out.
        let genesis = Block::genesis();
        let block =
            Block::mine_block_with(&genesis, json!("x"), Some(1), slow_clock(&genesis));
        assert_eq!(
            Block::is_valid_block(&genesis, &block),
            Err(ValidationError::DifficultyJump)
        );
    }

    #[test]
    fn tampered_data_is_rejected() {
        let genesis = Block::genesis();
        let mut block = Block::mine_block_with(&genesis, json!("x"), None, slow_clock(&genesis));
        block.data = json!("tampered");
        assert_eq!(
            Block::is_valid_block(&genesis, &block),
            Err(ValidationError::HashMismatch)
        );
    }

    #[test]
    fn block_serde_round_trip() {
        let genesis = Block::genesis();
        let block = Block::mine_block_with(
            &genesis,
            json!([{"id": "abc"}]),
            None,
            slow_clock(&genesis),
        );
        let encoded = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&encoded).unwrap();
        assert_eq!(block, decoded);
        assert!(Block::is_valid_block(&genesis, &decoded).is_ok());
    }

    #[test]
    fn structurally_equal_payloads_hash_identically() {
        let scrambled: Value = serde_json::from_str(r#"{"b":1,"a":2}"#).unwrap();
        let ordered: Value = serde_json::from_str(r#"{"a":2,"b":1}"#).unwrap();
        let first = Block::calculate_hash(1, 10.0, &scrambled, "prev", 0, 3);
        let second = Block::calculate_hash(1, 10.0, &ordered, "prev", 0, 3);
        assert_eq!(first, second);
    }

    #[test]
    fn meets_difficulty_counts_hex_characters() {
        assert!(meets_difficulty("000abc", 3));
        assert!(!meets_difficulty("00abc", 3));
        assert!(meets_difficulty("anything", 0));
        assert!(!meets_difficulty("0", 2));
    }
}
