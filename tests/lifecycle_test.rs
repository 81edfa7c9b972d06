//! Startup validation, network isolation and shutdown

mod common;

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;

use common::{block, eventually, tx, MockChain};
use token_sentinel::core::{connect_networks, validate_network, ConnectedNetwork};
use token_sentinel::{
    AppError, ChainClient, DisabledScorer, ErrorCode, LifecycleController, MemoryStore,
    NetworkConfig, WatcherConfig,
};

fn network(name: &str, expected_chain_id: Option<u64>) -> NetworkConfig {
    NetworkConfig {
        name: name.to_string(),
        ws_url: format!("ws://{}.invalid/v2/secret", name),
        expected_chain_id,
    }
}

fn connected(config: NetworkConfig, chain: &Arc<MockChain>) -> ConnectedNetwork {
    ConnectedNetwork {
        config,
        client: chain.clone(),
    }
}

fn controller(store: &Arc<MemoryStore>) -> LifecycleController {
    let config = WatcherConfig {
        shutdown_grace: Duration::from_secs(2),
        ..WatcherConfig::default()
    };
    LifecycleController::new(config, Arc::new(DisabledScorer), store.clone())
}

#[tokio::test]
async fn test_validation_checks_chain_id() {
    let chain = MockChain::new(8453);

    let identity = validate_network(&network("base", Some(8453)), &chain).await.unwrap();
    assert_eq!(identity.chain_id, 8453);
    assert_eq!(identity.latest_block, 19_000_000);

    let err = validate_network(&network("ethereum", Some(1)), &chain).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ChainIdMismatch);

    // No configured chain id: anything reachable passes
    assert!(validate_network(&network("devnet", None), &chain).await.is_ok());
}

#[tokio::test]
async fn test_unreachable_node_fails_validation() {
    let err = validate_network(&network("ethereum", Some(1)), &MockChain::unreachable())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RpcConnectionFailed);
}

#[tokio::test]
async fn test_connection_failures_are_isolated() {
    let networks = vec![network("ethereum", Some(1)), network("polygon", Some(137))];

    let connected = connect_networks(&networks, Duration::from_secs(5), |config| async move {
        if config.name == "polygon" {
            return Err(AppError::rpc_connection_failed("handshake refused"));
        }
        let client: Arc<dyn ChainClient> = Arc::new(MockChain::new(1));
        Ok(client)
    })
    .await;

    assert_eq!(connected.len(), 1);
    assert_eq!(connected[0].config.name, "ethereum");
}

#[tokio::test]
async fn test_stalled_connection_does_not_block_the_others() {
    let networks = vec![network("ethereum", Some(1)), network("polygon", Some(137))];

    let started = std::time::Instant::now();
    let connected = connect_networks(&networks, Duration::from_millis(300), |config| async move {
        if config.name == "ethereum" {
            // Handshake that never completes
            std::future::pending::<()>().await;
        }
        let client: Arc<dyn ChainClient> = Arc::new(MockChain::new(137));
        Ok::<_, AppError>(client)
    })
    .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(connected.len(), 1);
    assert_eq!(connected[0].config.name, "polygon");
    assert!(validate_network(&connected[0].config, connected[0].client.as_ref()).await.is_ok());
}

#[tokio::test]
async fn test_misconfigured_network_does_not_stop_the_others() {
    let token = Address::repeat_byte(0xaa);

    let healthy = Arc::new(MockChain::new(1));
    healthy.add_token(token, "Foo", "FOO", U256::from(18));
    healthy.add_block(block(100, vec![tx(1, Some(token))]));
    let feed = healthy.subscription();
    feed.send(100).unwrap();

    let wrong_chain = Arc::new(MockChain::new(56));
    let down = Arc::new(MockChain::unreachable());

    let store = Arc::new(MemoryStore::new());
    let networks = vec![
        connected(network("ethereum", Some(1)), &healthy),
        connected(network("base", Some(8453)), &wrong_chain),
        connected(network("polygon", Some(137)), &down),
    ];

    let watched = store.clone();
    let signal = async move {
        eventually(|| watched.len() == 1, Duration::from_secs(5)).await;
    };

    let reports = controller(&store).run(networks, signal).await.unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].network, "ethereum");
    assert_eq!(reports[0].stats.records_persisted, 1);

    let row = store.get(&token.to_string(), "ethereum").unwrap();
    assert_eq!(row.symbol, "FOO");
}

#[tokio::test]
async fn test_startup_fails_when_no_network_is_valid() {
    let store = Arc::new(MemoryStore::new());
    let networks = vec![
        connected(network("base", Some(8453)), &Arc::new(MockChain::new(1))),
        connected(network("polygon", Some(137)), &Arc::new(MockChain::unreachable())),
    ];

    let err = controller(&store)
        .run(networks, std::future::pending::<()>())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigNoNetworks);
}

#[tokio::test]
async fn test_same_token_on_two_networks_gives_two_rows() {
    let token = Address::repeat_byte(0xaa);
    let eth = Arc::new(MockChain::new(1));
    let base = Arc::new(MockChain::new(8453));
    for chain in [&eth, &base] {
        chain.add_token(token, "Foo", "FOO", U256::from(18));
        chain.add_block(block(100, vec![tx(1, Some(token))]));
        chain.subscription().send(100).unwrap();
    }

    let store = Arc::new(MemoryStore::new());
    let networks = vec![
        connected(network("ethereum", Some(1)), &eth),
        connected(network("base", Some(8453)), &base),
    ];

    let watched = store.clone();
    let signal = async move {
        eventually(|| watched.len() == 2, Duration::from_secs(5)).await;
    };
    let reports = controller(&store).run(networks, signal).await.unwrap();

    assert_eq!(reports.len(), 2);
    assert!(store.get(&token.to_string(), "ethereum").is_some());
    assert!(store.get(&token.to_string(), "base").is_some());
}
