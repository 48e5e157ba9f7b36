use std::sync::Arc;

use tempfile::TempDir;
use tollgate::{
    UserState,
    backend::{Creator, Host, InMemory},
};

use crate::helpers::fast_config;

#[tokio::test]
async fn test_in_memory_backend_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("backend.json");

    {
        let backend = InMemory::new();
        let creator = backend.creator();
        creator.new_set("usernames").await.unwrap().add("bob").await.unwrap();
        let users = creator.new_hash_map("users").await.unwrap();
        users.set("bob", "email", "bob@e.co").await.unwrap();
        let log = creator.new_list("log").await.unwrap();
        log.add("first").await.unwrap();
        log.add("second").await.unwrap();
        creator
            .new_key_value("meta")
            .await
            .unwrap()
            .set("version", "3")
            .await
            .unwrap();

        backend.save_to_file(&path).await.unwrap();
    }
    assert!(path.exists());

    let loaded = InMemory::load_from_file(&path).await.unwrap();
    assert_eq!(
        loaded.collection_ids().await,
        ["log", "meta", "usernames", "users"]
    );
    let creator = loaded.creator();
    assert!(creator.new_set("usernames").await.unwrap().has("bob").await.unwrap());
    let users = creator.new_hash_map("users").await.unwrap();
    assert_eq!(users.get("bob", "email").await.unwrap(), "bob@e.co");
    let log = creator.new_list("log").await.unwrap();
    assert_eq!(log.all().await.unwrap(), ["first", "second"]);
    let meta = creator.new_key_value("meta").await.unwrap();
    assert_eq!(meta.get("version").await.unwrap(), "3");
}

#[tokio::test]
async fn test_load_non_existent_file() {
    let dir = TempDir::new().unwrap();
    let backend = InMemory::load_from_file(dir.path().join("missing.json"))
        .await
        .unwrap();
    assert!(backend.collection_ids().await.is_empty());
}

#[tokio::test]
async fn test_load_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(InMemory::load_from_file(&path).await.is_err());
}

#[tokio::test]
async fn test_load_unknown_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("future.json");
    std::fs::write(&path, r#"{"_v": 9}"#).unwrap();
    assert!(InMemory::load_from_file(&path).await.is_err());
}

#[tokio::test]
async fn test_users_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.json");
    let config = tollgate::StateConfig {
        cookie_secret: Some("persistent-secret".to_string()),
        ..fast_config()
    };

    {
        let backend = InMemory::new();
        let state = UserState::with_config(Arc::new(backend.clone()), config.clone())
            .await
            .unwrap();
        state.add_user("bob", "hunter1", "bob@e.co").await.unwrap();
        state.set_admin_status("bob").await.unwrap();
        backend.save_to_file(&path).await.unwrap();
    }

    let backend = InMemory::load_from_file(&path).await.unwrap();
    let state = UserState::with_config(Arc::new(backend), config)
        .await
        .unwrap();
    assert!(state.has_user("bob").await);
    assert!(state.correct_password("bob", "hunter1").await);
    assert!(state.is_admin("bob").await);
}
