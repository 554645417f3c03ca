use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blockchain::{Block, Blockchain};
use crate::pubsub::{Channels, PubSub};
use crate::transaction::TransactionPool;
use crate::wallet::Wallet;

/// One node's state: chain, pending pool, its wallet, and the broadcast
/// endpoint. Everything is owned here and passed by handle, so several
/// nodes can coexist in one process (and in tests).
pub struct AppState {
    pub blockchain: Arc<Mutex<Blockchain>>,
    pub transaction_pool: Arc<Mutex<TransactionPool>>,
    pub wallet: Wallet,
    pub pubsub: PubSub,
}

impl AppState {
    pub fn new(channels: Channels) -> Self {
        let blockchain = Arc::new(Mutex::new(Blockchain::new()));
        let transaction_pool = Arc::new(Mutex::new(TransactionPool::new()));
        let pubsub = PubSub::with_channels(
            Arc::clone(&blockchain),
            Arc::clone(&transaction_pool),
            channels,
        );
        Self {
            blockchain,
            transaction_pool,
            wallet: Wallet::new(),
            pubsub,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Channels::default())
    }
}

/* ---------- Chain API Models ---------- */

/// The peer pull document: the full chain plus its length.
#[derive(Serialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Deserialize, Default)]
pub struct MineRequest {
    /// Explicit block payload; defaults to the pending pool plus a reward.
    pub data: Option<Value>,
}

#[derive(Serialize)]
pub struct BlockResponse {
    pub block: Block,
}

/* ---------- Transaction API Models ---------- */

#[derive(Deserialize)]
pub struct NewTransactionRequest {
    pub recipient: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub transaction: Value,
}

#[derive(Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Value>,
}

/* ---------- Wallet API Models ---------- */

#[derive(Serialize)]
pub struct WalletInfoResponse {
    pub address: String,
    pub balance: u64,
}
