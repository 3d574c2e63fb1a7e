//! Redis facade integration tests
//!
//! These tests require:
//! - Running Redis instance
//! - Environment variables: REDIS_HOST (REDIS_PORT, REDIS_PASSWORD optional)
//!
//! Run with: cargo test -p integration-tests --test redis_tests

use integration_tests::{check_test_env, test_config, test_facade, unique_key};
use neko_cache::{op, queue, CacheError, RedisFacade, Reply, ReplyKind, TransactionState};
use neko_common::RedisConfig;
use redis::Value;

fn set(key: &str, value: &str) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    cmd
}

// ============================================================================
// Do / Load / Exists
// ============================================================================

#[tokio::test]
async fn test_set_then_get() {
    if !check_test_env().await {
        return;
    }

    let facade = test_facade().unwrap();
    let key = unique_key("set-get");

    facade.command("SET").call((&key, "v")).await.unwrap();
    let reply = facade
        .loader(ReplyKind::String, "GET")
        .load(&key)
        .await
        .unwrap();
    assert_eq!(reply, Reply::String("v".to_string()));

    facade.execute("DEL", &key).await.unwrap();
}

#[tokio::test]
async fn test_exists_on_missing_key() {
    if !check_test_env().await {
        return;
    }

    let facade = test_facade().unwrap();
    assert!(!facade.exists(unique_key("missing")).await.unwrap());
}

#[tokio::test]
async fn test_load_hash_as_map() {
    if !check_test_env().await {
        return;
    }

    let facade = test_facade().unwrap();
    let key = unique_key("hash");

    facade
        .execute("HSET", (&key, "a", 1, "b", 2))
        .await
        .unwrap();
    let reply = facade
        .load(ReplyKind::Int64Map, "HGETALL", &key)
        .await
        .unwrap();

    let map = match reply {
        Reply::Int64Map(map) => map,
        other => panic!("unexpected reply: {other:?}"),
    };
    assert_eq!(map.get("a"), Some(&1));
    assert_eq!(map.get("b"), Some(&2));

    facade.execute("DEL", &key).await.unwrap();
}

#[tokio::test]
async fn test_load_mismatch_is_coercion_error() {
    if !check_test_env().await {
        return;
    }

    let facade = test_facade().unwrap();
    let key = unique_key("mismatch");
    facade.execute("SET", (&key, "text")).await.unwrap();

    let err = facade.load(ReplyKind::Int, "GET", &key).await.unwrap_err();
    assert!(err.is_coercion());

    facade.execute("DEL", &key).await.unwrap();
}

// ============================================================================
// Transactions
// ============================================================================

#[tokio::test]
async fn test_transaction_commit() {
    if !check_test_env().await {
        return;
    }

    let facade = test_facade().unwrap();
    let a = unique_key("tx-a");
    let b = unique_key("tx-b");

    let reply = facade
        .run_transaction(vec![queue(set(&a, "1")), queue(set(&b, "2"))])
        .await
        .unwrap();
    assert_eq!(reply, Value::Array(vec![Value::Okay, Value::Okay]));

    let value: String = facade.query("GET", &b).await.unwrap();
    assert_eq!(value, "2");

    facade.execute("DEL", (&a, &b)).await.unwrap();
}

#[tokio::test]
async fn test_transaction_discard_on_failure() {
    if !check_test_env().await {
        return;
    }

    let facade = test_facade().unwrap();
    let key = unique_key("tx-discard");

    let err = facade
        .run_transaction(vec![
            queue(set(&key, "1")),
            op(|_conn| {
                Box::pin(async {
                    Err(redis::RedisError::from((
                        redis::ErrorKind::ClientError,
                        "refused",
                    )))
                })
            }),
        ])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("refused"));

    // Nothing was applied
    assert!(!facade.exists(&key).await.unwrap());
}

#[tokio::test]
async fn test_scoped_transaction_abort() {
    if !check_test_env().await {
        return;
    }

    let facade = test_facade().unwrap();
    let key = unique_key("tx-abort");

    let mut tx = facade.transaction().await.unwrap();
    tx.enqueue(&set(&key, "1")).await.unwrap();
    assert_eq!(tx.state(), TransactionState::Open);
    tx.abort().await.unwrap();

    assert!(!facade.exists(&key).await.unwrap());
}

// ============================================================================
// Initialization
// ============================================================================

#[tokio::test]
async fn test_disabled_pool_rejects_commands() {
    let config = RedisConfig {
        enable: false,
        ..test_config().unwrap_or_default()
    };
    let facade = RedisFacade::from_config(&config);

    assert!(!facade.is_initialized());
    assert!(matches!(
        facade.execute("PING", "hello").await,
        Err(CacheError::PoolNotInitialized)
    ));
}
