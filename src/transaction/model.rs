use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::blockchain::Block;
use crate::error::TransactionError;
use crate::util::now_timestamp;
use crate::wallet::{
    MINING_REWARD, MINING_REWARD_INPUT_ADDRESS, Wallet, derive_address, verify_signature,
};

/// Sender metadata recorded alongside the outputs. Reward transactions omit
/// the public key and signature entirely; they are recognized by their
/// reserved input address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub timestamp: f64,
    pub amount: u64,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// A signed value transfer: outputs map each recipient (and the sender's
/// change entry) to an amount, and the input carries the sender's balance
/// snapshot plus a signature over the output map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub output: BTreeMap<String, u64>,
    pub input: TransactionInput,
}

impl Transaction {
    /// Create a signed transaction moving `amount` from the sender to
    /// `recipient`. The sender's balance is replayed from the chain; the
    /// remainder becomes the change entry.
    pub fn create(
        sender: &Wallet,
        chain: &[Block],
        recipient: &str,
        amount: u64,
    ) -> Result<Self, TransactionError> {
        if amount == 0 {
            return Err(TransactionError::ZeroAmount);
        }

        let balance = sender.calculate_balance(chain);
        if amount > balance {
            return Err(TransactionError::ExceedsBalance { amount, balance });
        }

        let mut output = BTreeMap::new();
        output.insert(recipient.to_string(), amount);
        output.insert(sender.address.clone(), balance - amount);

        let input = build_input(sender, balance, &output);

        Ok(Self {
            id: Uuid::new_v4().simple().to_string(),
            output,
            input,
        })
    }

    /// Fold another spend into this pending transaction. Only the original
    /// sender may update, and only within the change still allocated to
    /// them; the input is rebuilt and re-signed afterwards.
    pub fn update(
        &mut self,
        sender: &Wallet,
        recipient: &str,
        amount: u64,
    ) -> Result<(), TransactionError> {
        if amount == 0 {
            return Err(TransactionError::ZeroAmount);
        }

        let change = *self
            .output
            .get(&sender.address)
            .ok_or(TransactionError::NotSender)?;
        if amount > change {
            return Err(TransactionError::ExceedsBalance {
                amount,
                balance: change,
            });
        }

        self.output.insert(sender.address.clone(), change - amount);
        *self.output.entry(recipient.to_string()).or_insert(0) += amount;

        // The output sum is unchanged, so the input amount stays equal to
        // the balance captured when the transaction was first created.
        let total: u64 = self.output.values().sum();
        self.input = build_input(sender, total, &self.output);

        Ok(())
    }

    /// The fixed reward transaction crediting a miner. Unsigned; validated
    /// structurally via the reserved input address.
    pub fn reward(miner: &Wallet) -> Self {
        let mut output = BTreeMap::new();
        output.insert(miner.address.clone(), MINING_REWARD);

        Self {
            id: Uuid::new_v4().simple().to_string(),
            output,
            input: TransactionInput {
                timestamp: now_timestamp(),
                amount: MINING_REWARD,
                address: MINING_REWARD_INPUT_ADDRESS.to_string(),
                public_key: None,
                signature: None,
            },
        }
    }

    /// Validate outputs against the input amount and check the signature.
    /// Applied both before local pool admission and to peer messages.
    pub fn is_valid(&self) -> Result<(), TransactionError> {
        let output_total: u64 = self.output.values().sum();

        if self.input.address == MINING_REWARD_INPUT_ADDRESS {
            if self.output.len() != 1 {
                return Err(TransactionError::RewardOutputShape);
            }
            if output_total != MINING_REWARD || self.input.amount != MINING_REWARD {
                return Err(TransactionError::RewardAmount);
            }
            return Ok(());
        }

        if output_total != self.input.amount {
            return Err(TransactionError::OutputMismatch);
        }

        let (Some(public_key), Some(signature)) =
            (self.input.public_key.as_ref(), self.input.signature.as_ref())
        else {
            return Err(TransactionError::MissingSignature);
        };

        if !verify_signature(public_key, &output_payload(&self.output), signature) {
            return Err(TransactionError::InvalidSignature);
        }

        match derive_address(public_key) {
            Ok(address) if address == self.input.address => Ok(()),
            _ => Err(TransactionError::AddressMismatch),
        }
    }

    /// Serialize for block data and wire payloads.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("transactions always serialize")
    }

    /// Deserialize a transaction received from a peer or API caller.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// The signed portion of a transaction: its output map as a JSON object.
fn output_payload(output: &BTreeMap<String, u64>) -> Value {
    serde_json::to_value(output).expect("output maps always serialize")
}

fn build_input(sender: &Wallet, amount: u64, output: &BTreeMap<String, u64>) -> TransactionInput {
    TransactionInput {
        timestamp: now_timestamp(),
        amount,
        address: sender.address.clone(),
        public_key: Some(sender.public_key_hex()),
        signature: Some(sender.sign(&output_payload(output))),
    }
}
