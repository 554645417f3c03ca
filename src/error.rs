use thiserror::Error;

/// Block or chain level rule violation. Each rule gets its own variant so
/// callers (and tests) can tell exactly which check failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("previous_hash must reference the previous block")]
    BrokenHashLink,
    #[error("block index must increment sequentially")]
    IndexGap,
    #[error("proof-of-work requirement was not met")]
    InsufficientWork,
    #[error("difficulty must only adjust by one between blocks")]
    DifficultyJump,
    #[error("block hash does not match its contents")]
    HashMismatch,
    #[error("chain must contain at least the genesis block")]
    EmptyChain,
    #[error("chain must start with the genesis block")]
    GenesisMismatch,
}

/// Transaction construction or validation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("amount {amount} exceeds available balance {balance}")]
    ExceedsBalance { amount: u64, balance: u64 },
    #[error("transaction does not belong to the sender")]
    NotSender,
    #[error("transaction outputs do not match the input amount")]
    OutputMismatch,
    #[error("transaction is missing its public key or signature")]
    MissingSignature,
    #[error("invalid signature for transaction")]
    InvalidSignature,
    #[error("address does not match the public key")]
    AddressMismatch,
    #[error("mining reward must target a single address")]
    RewardOutputShape,
    #[error("mining reward amount is invalid")]
    RewardAmount,
}

/// Failure while talking to peers or decoding broadcast traffic. These are
/// logged and dropped at the replication boundary, never propagated.
#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("peer request to {url} failed: {source}")]
    PeerUnreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("peer {url} returned a malformed chain document: {source}")]
    MalformedChain {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unknown broadcast channel: {0}")]
    UnknownChannel(String),
    #[error("malformed payload on channel {channel}: {source}")]
    MalformedPayload {
        channel: String,
        #[source]
        source: serde_json::Error,
    },
}
