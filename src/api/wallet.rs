use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, WalletInfoResponse};

/// This node's wallet address and its balance replayed from the chain.
#[get("/wallet/info")]
pub async fn wallet_info(state: web::Data<AppState>) -> impl Responder {
    let balance = {
        let blockchain = state.blockchain.lock().expect("mutex poisoned");
        state.wallet.calculate_balance(&blockchain.chain)
    };

    HttpResponse::Ok().json(WalletInfoResponse {
        address: state.wallet.address.clone(),
        balance,
    })
}
