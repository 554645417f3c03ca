use std::collections::HashMap;

use serde_json::Value;

use super::Transaction;
use crate::blockchain::Block;

/// In-memory store for pending transactions, keyed by id. Entries leave the
/// pool only once they appear in a mined block; competing transactions from
/// the same sender are not evicted automatically.
#[derive(Debug, Default)]
pub struct TransactionPool {
    pub transaction_map: HashMap<String, Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a transaction. Last write wins for a given id.
    pub fn set_transaction(&mut self, transaction: Transaction) {
        self.transaction_map
            .insert(transaction.id.clone(), transaction);
    }

    /// Find a pending transaction sent by the given address, so callers can
    /// extend it via `update` instead of creating a competing one.
    pub fn existing_transaction(&self, address: &str) -> Option<&Transaction> {
        self.transaction_map
            .values()
            .find(|tx| tx.input.address == address)
    }

    /// Remove every pool entry whose id appears in a mined block's data.
    /// Idempotent; run after any local mine, accepted peer block, or chain
    /// replacement.
    pub fn clear_blockchain_transactions(&mut self, chain: &[Block]) {
        for block in chain {
            let Some(items) = block.data.as_array() else {
                continue;
            };
            for item in items {
                if let Some(id) = item.get("id").and_then(Value::as_str) {
                    self.transaction_map.remove(id);
                }
            }
        }
    }

    /// All pending transactions, in no particular order.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transaction_map.values()
    }

    pub fn len(&self) -> usize {
        self.transaction_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transaction_map.is_empty()
    }
}
