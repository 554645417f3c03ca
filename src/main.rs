mod api;
mod blockchain;
mod error;
mod peer;
mod pubsub;
mod transaction;
mod util;
mod wallet;

use std::env;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;

use api::AppState;
use peer::{parse_peer_urls, sync_chain_from_peers};
use pubsub::Channels;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);

    let state = Arc::new(AppState::new(Channels::from_env()));
    info!("Node wallet address: {}", state.wallet.address);

    // Pull the chain from configured peers before serving; with no peer
    // reachable the node starts from its genesis chain.
    let seeds = env::var("PEER_SEEDS")
        .map(|s| parse_peer_urls(&s))
        .unwrap_or_default();
    if !seeds.is_empty() {
        sync_chain_from_peers(&state.blockchain, &seeds).await;
    }

    // Steady state: listen for blocks, chains and transactions on the bus.
    state.pubsub.spawn_listener();

    println!("⛓️ Starting blockchain node at http://{host}:{port}");

    let data = web::Data::from(Arc::clone(&state));
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
