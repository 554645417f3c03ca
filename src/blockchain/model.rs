use serde_json::Value;

use super::Block;
use crate::error::ValidationError;

/// In-memory blockchain with Proof-of-Work and the longest-valid-chain
/// replacement rule. The embedding node must serialize all mutation paths
/// against a single instance; there is no internal locking here.
#[derive(Debug)]
pub struct Blockchain {
    pub chain: Vec<Block>,
}

impl Blockchain {
    /// Initialize a new blockchain holding only the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
        }
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("blockchain always holds at least the genesis block")
    }

    /// Mine and append a new block carrying `data`. This is the only path
    /// for authoritative local growth.
    pub fn add_block(&mut self, data: Value) -> &Block {
        let block = Block::mine_block(self.last_block(), data);
        self.chain.push(block);
        self.last_block()
    }

    /// Mine with an injectable timestamp provider (used by tests to steer
    /// the difficulty adjustment).
    pub fn add_block_with<F>(&mut self, data: Value, timestamp_provider: F) -> &Block
    where
        F: Fn() -> f64,
    {
        let block = Block::mine_block_with(self.last_block(), data, None, timestamp_provider);
        self.chain.push(block);
        self.last_block()
    }

    /// Attempt to append a peer-provided block after validating it against
    /// the current head. Leaves the chain untouched on failure.
    pub fn try_add_block(&mut self, block: Block) -> bool {
        if Block::is_valid_block(self.last_block(), &block).is_err() {
            return false;
        }
        self.chain.push(block);
        true
    }

    /// Validate a whole chain: genesis match plus every adjacent pair.
    pub fn is_valid_chain(chain: &[Block]) -> Result<(), ValidationError> {
        if chain.is_empty() {
            return Err(ValidationError::EmptyChain);
        }

        if chain[0] != Block::genesis() {
            return Err(ValidationError::GenesisMismatch);
        }

        for pair in chain.windows(2) {
            Block::is_valid_block(&pair[0], &pair[1])?;
        }

        Ok(())
    }

    /// Replace the local chain if the candidate is strictly longer and
    /// fully valid. Returns true when the replacement occurred.
    pub fn replace_chain(&mut self, new_chain: Vec<Block>) -> bool {
        if new_chain.len() <= self.chain.len() {
            return false;
        }

        if Self::is_valid_chain(&new_chain).is_err() {
            return false;
        }

        self.chain = new_chain;
        true
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}
