mod chain;
mod health;
pub mod models;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::post_block)
            .service(tx::get_transactions)
            .service(tx::post_transaction)
            .service(tx::import_transaction)
            .service(wallet::wallet_info),
    );
}
