use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, warn};
use serde_json::Value;

use super::models::{
    AppState, NewTransactionRequest, TransactionResponse, TransactionsResponse,
};
use crate::transaction::Transaction;

/// List the pending pool.
#[get("/transactions")]
pub async fn get_transactions(state: web::Data<AppState>) -> impl Responder {
    let pool = state.transaction_pool.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(TransactionsResponse {
        transactions: pool.transactions().map(Transaction::to_value).collect(),
    })
}

/// Create (or extend) this wallet's pending transaction and broadcast it.
/// When a pending transaction from this wallet already exists, the spend is
/// folded into it instead of competing with it.
#[post("/transactions")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTransactionRequest>,
) -> impl Responder {
    let request = body.into_inner();

    let chain_snapshot = {
        let blockchain = state.blockchain.lock().expect("mutex poisoned");
        blockchain.chain.clone()
    };

    let transaction = {
        let mut pool = state.transaction_pool.lock().expect("mutex poisoned");

        let result = match pool.existing_transaction(&state.wallet.address) {
            Some(existing) => {
                debug!("Extending pending transaction {}", existing.id);
                let mut updated = existing.clone();
                updated
                    .update(&state.wallet, &request.recipient, request.amount)
                    .map(|()| updated)
            }
            None => Transaction::create(
                &state.wallet,
                &chain_snapshot,
                &request.recipient,
                request.amount,
            ),
        };

        match result {
            Ok(transaction) => {
                pool.set_transaction(transaction.clone());
                transaction
            }
            Err(err) => {
                warn!("Rejected transaction request: {err}");
                return HttpResponse::BadRequest().body(err.to_string());
            }
        }
    };

    state.pubsub.broadcast_transaction(&transaction);

    HttpResponse::Created().json(TransactionResponse {
        transaction: transaction.to_value(),
    })
}

/// Admit a transaction created elsewhere (e.g. relayed by another node's
/// API consumer). Validated like any peer message before entering the pool.
#[post("/transactions/import")]
pub async fn import_transaction(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> impl Responder {
    let payload = body.into_inner();
    let candidate = payload.get("transaction").cloned().unwrap_or(payload);

    let transaction = match Transaction::from_value(candidate) {
        Ok(transaction) => transaction,
        Err(err) => {
            warn!("Rejected malformed transaction import: {err}");
            return HttpResponse::BadRequest().body(format!("malformed transaction: {err}"));
        }
    };

    if let Err(err) = transaction.is_valid() {
        warn!("Rejected invalid transaction import: {err}");
        return HttpResponse::BadRequest().body(err.to_string());
    }

    {
        let mut pool = state.transaction_pool.lock().expect("mutex poisoned");
        pool.set_transaction(transaction.clone());
    }
    state.pubsub.broadcast_transaction(&transaction);

    HttpResponse::Ok().json(TransactionResponse {
        transaction: transaction.to_value(),
    })
}
