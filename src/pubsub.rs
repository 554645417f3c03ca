use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::blockchain::{Block, Blockchain};
use crate::error::ReplicationError;
use crate::transaction::{Transaction, TransactionPool};
use crate::util::canonical_json;

/// Default broadcast channel names; override per deployment via env.
pub const DEFAULT_BLOCK_CHANNEL: &str = "d8a-coin.block";
pub const DEFAULT_CHAIN_CHANNEL: &str = "d8a-coin.chain";
pub const DEFAULT_TRANSACTION_CHANNEL: &str = "d8a-coin.transaction";

/// Buffered messages per subscriber before the slowest one starts lagging.
const BUS_CAPACITY: usize = 64;

/// Names of the three logical broadcast channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    pub block: String,
    pub chain: String,
    pub transaction: String,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            block: DEFAULT_BLOCK_CHANNEL.to_string(),
            chain: DEFAULT_CHAIN_CHANNEL.to_string(),
            transaction: DEFAULT_TRANSACTION_CHANNEL.to_string(),
        }
    }
}

impl Channels {
    /// Channel names from `PUBSUB_*_CHANNEL` env vars, with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            block: std::env::var("PUBSUB_BLOCK_CHANNEL").unwrap_or(defaults.block),
            chain: std::env::var("PUBSUB_CHAIN_CHANNEL").unwrap_or(defaults.chain),
            transaction: std::env::var("PUBSUB_TRANSACTION_CHANNEL")
                .unwrap_or(defaults.transaction),
        }
    }
}

/// A message as carried on the bus: a channel name plus its JSON payload.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub channel: String,
    pub payload: String,
}

/// The closed set of message kinds, decoded once at the transport boundary.
#[derive(Debug, Clone)]
pub enum Message {
    Block(Block),
    Chain(Vec<Block>),
    Transaction(Transaction),
}

/// Map a raw bus message onto a typed one. Unknown channels and payloads
/// that do not parse are reported, not panicked on.
pub fn decode_message(channels: &Channels, raw: &RawMessage) -> Result<Message, ReplicationError> {
    let malformed = |source| ReplicationError::MalformedPayload {
        channel: raw.channel.clone(),
        source,
    };

    if raw.channel == channels.block {
        serde_json::from_str(&raw.payload)
            .map(Message::Block)
            .map_err(malformed)
    } else if raw.channel == channels.chain {
        serde_json::from_str(&raw.payload)
            .map(Message::Chain)
            .map_err(malformed)
    } else if raw.channel == channels.transaction {
        serde_json::from_str(&raw.payload)
            .map(Message::Transaction)
            .map_err(malformed)
    } else {
        Err(ReplicationError::UnknownChannel(raw.channel.clone()))
    }
}

/// Broadcast endpoint for one node. Nodes that share a bus (the
/// `broadcast::Sender`) see each other's messages; handlers are idempotent,
/// so duplicates and our own echoes are harmless.
pub struct PubSub {
    channels: Channels,
    sender: broadcast::Sender<RawMessage>,
    blockchain: Arc<Mutex<Blockchain>>,
    pool: Arc<Mutex<TransactionPool>>,
}

impl PubSub {
    pub fn new(blockchain: Arc<Mutex<Blockchain>>, pool: Arc<Mutex<TransactionPool>>) -> Self {
        Self::with_channels(blockchain, pool, Channels::default())
    }

    /// Start a fresh bus with the given channel names.
    pub fn with_channels(
        blockchain: Arc<Mutex<Blockchain>>,
        pool: Arc<Mutex<TransactionPool>>,
        channels: Channels,
    ) -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self::with_bus(blockchain, pool, channels, sender)
    }

    /// Join an existing bus, e.g. to connect a second node in-process.
    pub fn with_bus(
        blockchain: Arc<Mutex<Blockchain>>,
        pool: Arc<Mutex<TransactionPool>>,
        channels: Channels,
        sender: broadcast::Sender<RawMessage>,
    ) -> Self {
        Self {
            channels,
            sender,
            blockchain,
            pool,
        }
    }

    /// Handle to the underlying bus for wiring up further nodes.
    pub fn bus(&self) -> broadcast::Sender<RawMessage> {
        self.sender.clone()
    }

    pub fn broadcast_block(&self, block: &Block) {
        self.publish(&self.channels.block, block_payload(block));
    }

    pub fn broadcast_chain(&self, chain: &[Block]) {
        self.publish(&self.channels.chain, chain_payload(chain));
    }

    pub fn broadcast_transaction(&self, transaction: &Transaction) {
        self.publish(
            &self.channels.transaction,
            canonical_json(&transaction.to_value()),
        );
    }

    fn publish(&self, channel: &str, payload: String) {
        let raw = RawMessage {
            channel: channel.to_string(),
            payload,
        };
        if self.sender.send(raw).is_err() {
            debug!("No subscribers on channel {channel}; message dropped");
        }
    }

    /// Decode and apply one inbound message. Validation failures are logged
    /// and dropped; local state is left unchanged. Never blocks on I/O.
    pub fn handle_raw(&self, raw: &RawMessage) {
        match decode_message(&self.channels, raw) {
            Ok(message) => self.apply(message),
            Err(err) => warn!("Rejected inbound message: {err}"),
        }
    }

    fn apply(&self, message: Message) {
        match message {
            Message::Block(block) => {
                let hash = block.hash.clone();
                let appended = {
                    let mut blockchain = self.blockchain.lock().expect("mutex poisoned");
                    blockchain.try_add_block(block)
                };
                if appended {
                    self.prune_pool();
                    info!("Appended block {hash} from broadcast");
                } else {
                    debug!("Ignored broadcast block {hash}");
                }
            }
            Message::Chain(chain) => {
                let replaced = {
                    let mut blockchain = self.blockchain.lock().expect("mutex poisoned");
                    blockchain.replace_chain(chain)
                };
                if replaced {
                    self.prune_pool();
                    info!("Replaced local chain from broadcast");
                }
            }
            Message::Transaction(transaction) => match transaction.is_valid() {
                Ok(()) => {
                    let mut pool = self.pool.lock().expect("mutex poisoned");
                    pool.set_transaction(transaction);
                }
                Err(err) => warn!("Dropped invalid broadcast transaction: {err}"),
            },
        }
    }

    fn prune_pool(&self) {
        let blockchain = self.blockchain.lock().expect("mutex poisoned");
        let mut pool = self.pool.lock().expect("mutex poisoned");
        pool.clear_blockchain_transactions(&blockchain.chain);
    }

    /// Run the steady-state listener as a background task: receive, decode,
    /// apply. Lagged receivers skip ahead; the task ends when every sender
    /// handle is gone.
    pub fn spawn_listener(&self) -> JoinHandle<()> {
        let mut receiver = self.sender.subscribe();
        let listener = Self {
            channels: self.channels.clone(),
            sender: self.sender.clone(),
            blockchain: Arc::clone(&self.blockchain),
            pool: Arc::clone(&self.pool),
        };

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(raw) => listener.handle_raw(&raw),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Broadcast listener lagged; skipped {skipped} messages");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

fn block_payload(block: &Block) -> String {
    canonical_json(&serde_json::to_value(block).expect("blocks always serialize"))
}

fn chain_payload(chain: &[Block]) -> String {
    let blocks: Vec<Value> = chain
        .iter()
        .map(|b| serde_json::to_value(b).expect("blocks always serialize"))
        .collect();
    canonical_json(&Value::Array(blocks))
}
