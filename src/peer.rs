use std::sync::Mutex;
use std::time::Duration;

use log::{info, warn};
use serde::Deserialize;

use crate::blockchain::{Block, Blockchain};
use crate::error::ReplicationError;

/// Per-request timeout for the startup chain fetch. A slow peer is skipped,
/// not retried.
pub const PEER_SYNC_TIMEOUT_SECS: u64 = 5;

/// The document peers serve at `/api/chain`.
#[derive(Debug, Deserialize)]
struct ChainDocument {
    chain: Vec<Block>,
}

/// Turn a comma-separated `PEER_SEEDS` value into a list of base URLs.
pub fn parse_peer_urls(peers: &str) -> Vec<String> {
    peers
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pull `/api/chain` from each peer in order and adopt the first chain that
/// wins `replace_chain`. Failures are logged per peer and the next one is
/// tried; with no reachable peers the node keeps its genesis chain.
pub async fn sync_chain_from_peers(blockchain: &Mutex<Blockchain>, peer_urls: &[String]) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(PEER_SYNC_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            warn!("Could not build peer sync client: {err}");
            return false;
        }
    };

    for url in peer_urls {
        match fetch_peer_chain(&client, url).await {
            Ok(remote_chain) => {
                let mut local = blockchain.lock().expect("mutex poisoned");
                if local.replace_chain(remote_chain) {
                    info!("Adopted chain from peer {url}");
                    return true;
                }
            }
            Err(err) => warn!("Failed to sync from {url}: {err}"),
        }
    }

    false
}

async fn fetch_peer_chain(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<Block>, ReplicationError> {
    let endpoint = format!("{}/api/chain", url.trim_end_matches('/'));

    let response = client
        .get(&endpoint)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|source| ReplicationError::PeerUnreachable {
            url: url.to_string(),
            source,
        })?;

    let document: ChainDocument =
        response
            .json()
            .await
            .map_err(|source| ReplicationError::MalformedChain {
                url: url.to_string(),
                source,
            })?;

    Ok(document.chain)
}
