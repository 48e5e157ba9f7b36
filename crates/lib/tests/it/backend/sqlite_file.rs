use std::sync::Arc;

use tempfile::TempDir;
use tollgate::{
    StateConfig, UserState,
    backend::{Host, sql::SqlxBackend},
};

use crate::helpers::fast_config;

#[tokio::test]
async fn test_sqlite_file_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.db");
    let config = StateConfig {
        cookie_secret: Some("persistent-secret".to_string()),
        ..fast_config()
    };

    {
        let backend = SqlxBackend::open_sqlite(&path).await.unwrap();
        let state = UserState::with_config(Arc::new(backend.clone()), config.clone())
            .await
            .unwrap();
        state.add_user("bob", "hunter1", "bob@e.co").await.unwrap();
        state.add_unconfirmed("bob", "pending-code").await.unwrap();
        backend.close().await.unwrap();
    }

    let backend = SqlxBackend::open_sqlite(&path).await.unwrap();
    let state = UserState::with_config(Arc::new(backend), config)
        .await
        .unwrap();
    assert!(state.correct_password("bob", "hunter1").await);
    assert_eq!(
        state
            .find_user_by_confirmation_code("pending-code")
            .await
            .unwrap(),
        "bob"
    );
}

#[tokio::test]
async fn test_connect_dispatches_on_scheme() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("any.db").display());
    let backend = SqlxBackend::connect(&url).await.unwrap();
    assert!(backend.is_sqlite());
    backend.ping().await.unwrap();

    assert!(SqlxBackend::connect("mysql://localhost/db").await.is_err());
}

#[tokio::test]
async fn test_sql_tokens_need_manual_cleanup() {
    let backend = SqlxBackend::sqlite_in_memory().await.unwrap();
    let state = UserState::with_config(Arc::new(backend), fast_config())
        .await
        .unwrap();
    assert!(!state.token_expiry_supported());

    state
        .set_token("bob", "t0k3n", std::time::Duration::from_millis(1))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert_eq!(state.get_token("bob").await.unwrap(), "t0k3n");

    state.remove_token("bob").await.unwrap();
    assert!(state.get_token("bob").await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_counter_and_list_appends() {
    let dir = TempDir::new().unwrap();
    let backend = SqlxBackend::open_sqlite(dir.path().join("busy.db"))
        .await
        .unwrap();
    let kv = backend.creator().new_key_value("counters").await.unwrap();
    let list = backend.creator().new_list("log").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let kv = kv.clone();
        let list = list.clone();
        handles.push(tokio::spawn(async move {
            kv.inc("hits").await.unwrap();
            list.add(&format!("entry-{i}")).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(kv.get("hits").await.unwrap(), "16");
    let mut items = list.all().await.unwrap();
    items.sort();
    let mut expected: Vec<String> = (0..16).map(|i| format!("entry-{i}")).collect();
    expected.sort();
    assert_eq!(items, expected);
}
