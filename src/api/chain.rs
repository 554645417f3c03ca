use actix_web::{HttpResponse, Responder, get, post, web};
use log::info;
use serde_json::Value;

use super::models::{AppState, BlockResponse, ChainResponse, MineRequest};
use crate::transaction::Transaction;

/// Get the full chain. Also serves the peer pull protocol.
#[get("/chain")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let blockchain = state.blockchain.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ChainResponse {
        chain: blockchain.chain.clone(),
        length: blockchain.len(),
    })
}

/// Mine a new block. Without an explicit payload the block packages every
/// pending transaction plus this node's mining reward. Mining blocks the
/// handler; the chain lock serializes it against inbound replication.
#[post("/blocks")]
pub async fn post_block(
    state: web::Data<AppState>,
    body: Option<web::Json<MineRequest>>,
) -> impl Responder {
    let requested = body.and_then(|b| b.into_inner().data);

    let data = match requested {
        Some(value) => value,
        None => {
            let mut payload: Vec<Value> = {
                let pool = state.transaction_pool.lock().expect("mutex poisoned");
                pool.transactions().map(Transaction::to_value).collect()
            };
            payload.push(Transaction::reward(&state.wallet).to_value());
            Value::Array(payload)
        }
    };

    let (block, chain_snapshot) = {
        let mut blockchain = state.blockchain.lock().expect("mutex poisoned");
        let block = blockchain.add_block(data).clone();
        let mut pool = state.transaction_pool.lock().expect("mutex poisoned");
        pool.clear_blockchain_transactions(&blockchain.chain);
        (block, blockchain.chain.clone())
    };

    info!(
        "Mined block #{} (hash={}, difficulty={})",
        block.index, block.hash, block.difficulty
    );

    // Publish the block, then the full chain for peers that missed it.
    state.pubsub.broadcast_block(&block);
    state.pubsub.broadcast_chain(&chain_snapshot);

    HttpResponse::Created().json(BlockResponse { block })
}
