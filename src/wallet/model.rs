use secp256k1::{PublicKey, SecretKey};
use serde_json::Value;

use super::STARTING_BALANCE;
use super::keys::{address_from_key, generate_keypair, sign_payload};
use crate::blockchain::Block;
use crate::transaction::Transaction;

/// A participant in the network: an ECDSA keypair plus the address derived
/// from it. The balance is never stored; it is recomputed by replaying the
/// chain whenever it is needed.
#[derive(Debug, Clone)]
pub struct Wallet {
    secret_key: SecretKey,
    public_key: PublicKey,
    pub address: String,
}

impl Wallet {
    pub fn new() -> Self {
        let (secret_key, public_key) = generate_keypair();
        let address = address_from_key(&public_key);
        Self {
            secret_key,
            public_key,
            address,
        }
    }

    /// Compressed public key as hex, the serialized form carried in
    /// transaction inputs.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Sign a canonicalized JSON payload with the wallet's private key.
    pub fn sign(&self, payload: &Value) -> String {
        sign_payload(&self.secret_key, payload)
    }

    /// Balance of this wallet derived from the chain.
    pub fn calculate_balance(&self, chain: &[Block]) -> u64 {
        Self::balance_of(chain, &self.address)
    }

    /// Replay the chain to compute an address's balance.
    ///
    /// A transaction sent by the address resets the balance to its own
    /// change entry, since the change was computed from the full balance at
    /// signing time. Any other transaction paying the address adds to it.
    pub fn balance_of(chain: &[Block], address: &str) -> u64 {
        let mut balance = STARTING_BALANCE;

        for block in chain {
            let Some(items) = block.data.as_array() else {
                continue;
            };
            for item in items {
                let Ok(transaction) = serde_json::from_value::<Transaction>(item.clone()) else {
                    continue;
                };
                if transaction.input.address == address {
                    balance = transaction.output.get(address).copied().unwrap_or(0);
                } else if let Some(amount) = transaction.output.get(address) {
                    balance += amount;
                }
            }
        }

        balance
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Blockchain, MINE_RATE_SECS};
    use crate::wallet::keys::verify_signature;
    use serde_json::json;

    fn mine_with_data(blockchain: &mut Blockchain, data: Value) {
        let base = blockchain.last_block().timestamp + MINE_RATE_SECS * 2.0;
        blockchain.add_block_with(data, move || base);
    }

    #[test]
    fn fresh_wallet_has_starting_balance() {
        let wallet = Wallet::new();
        let blockchain = Blockchain::new();
        assert_eq!(wallet.calculate_balance(&blockchain.chain), STARTING_BALANCE);
    }

    #[test]
    fn signature_verifies_against_own_public_key() {
        let wallet = Wallet::new();
        let payload = json!({"to": "someone", "amount": 10});
        let signature = wallet.sign(&payload);
        assert!(verify_signature(&wallet.public_key_hex(), &payload, &signature));
    }

    #[test]
    fn two_wallets_have_distinct_addresses() {
        assert_ne!(Wallet::new().address, Wallet::new().address);
    }

    #[test]
    fn balance_resets_after_own_transaction() {
        let sender = Wallet::new();
        let recipient = Wallet::new();
        let mut blockchain = Blockchain::new();

        let tx = Transaction::create(&sender, &blockchain.chain, &recipient.address, 300)
            .expect("valid transaction");
        mine_with_data(&mut blockchain, json!([tx.to_value()]));

        assert_eq!(
            sender.calculate_balance(&blockchain.chain),
            STARTING_BALANCE - 300
        );
        assert_eq!(
            recipient.calculate_balance(&blockchain.chain),
            STARTING_BALANCE + 300
        );
    }

    #[test]
    fn received_amounts_accumulate() {
        let alice = Wallet::new();
        let bob = Wallet::new();
        let carol = Wallet::new();
        let mut blockchain = Blockchain::new();

        let from_alice = Transaction::create(&alice, &blockchain.chain, &carol.address, 100)
            .expect("valid transaction");
        mine_with_data(&mut blockchain, json!([from_alice.to_value()]));

        let from_bob = Transaction::create(&bob, &blockchain.chain, &carol.address, 50)
            .expect("valid transaction");
        mine_with_data(&mut blockchain, json!([from_bob.to_value()]));

        assert_eq!(
            carol.calculate_balance(&blockchain.chain),
            STARTING_BALANCE + 150
        );
    }

    #[test]
    fn spend_after_receive_uses_replayed_balance() {
        let alice = Wallet::new();
        let bob = Wallet::new();
        let mut blockchain = Blockchain::new();

        let funding = Transaction::create(&alice, &blockchain.chain, &bob.address, 500)
            .expect("valid transaction");
        mine_with_data(&mut blockchain, json!([funding.to_value()]));

        // Bob now holds STARTING_BALANCE + 500 and spends from that figure.
        let spend = Transaction::create(&bob, &blockchain.chain, &alice.address, 1200)
            .expect("balance covers the spend");
        assert_eq!(spend.input.amount, STARTING_BALANCE + 500);
        mine_with_data(&mut blockchain, json!([spend.to_value()]));

        assert_eq!(
            bob.calculate_balance(&blockchain.chain),
            STARTING_BALANCE + 500 - 1200
        );
    }

    #[test]
    fn non_transaction_block_data_is_ignored() {
        let wallet = Wallet::new();
        let mut blockchain = Blockchain::new();
        mine_with_data(&mut blockchain, json!("free-form payload"));
        mine_with_data(&mut blockchain, json!([{"unrelated": true}]));
        assert_eq!(wallet.calculate_balance(&blockchain.chain), STARTING_BALANCE);
    }
}
