use std::time::Duration;

use crate::helpers::{backend_expires_fields, test_backend};

#[tokio::test]
async fn test_ping_and_close() {
    let host = test_backend().await;
    host.ping().await.unwrap();
    host.close().await.unwrap();
    assert!(host.ping().await.is_err());
}

#[tokio::test]
async fn test_key_value_operations() {
    let host = test_backend().await;
    let kv = host.creator().new_key_value("settings").await.unwrap();

    kv.set("theme", "dark").await.unwrap();
    kv.set("theme", "light").await.unwrap();
    assert_eq!(kv.get("theme").await.unwrap(), "light");

    let err = kv.get("missing").await.unwrap_err();
    assert!(err.is_not_found());

    kv.del("theme").await.unwrap();
    assert!(kv.get("theme").await.is_err());
    // Deleting an absent key is fine
    kv.del("theme").await.unwrap();
}

#[tokio::test]
async fn test_key_value_counter() {
    let host = test_backend().await;
    let kv = host.creator().new_key_value("counters").await.unwrap();

    assert_eq!(kv.inc("visits").await.unwrap(), "1");
    assert_eq!(kv.inc("visits").await.unwrap(), "2");
    assert_eq!(kv.get("visits").await.unwrap(), "2");

    kv.set("visits", "41").await.unwrap();
    assert_eq!(kv.inc("visits").await.unwrap(), "42");
}

#[tokio::test]
async fn test_key_value_clear_and_remove() {
    let host = test_backend().await;
    let kv = host.creator().new_key_value("scratch").await.unwrap();
    kv.set("a", "1").await.unwrap();
    kv.set("b", "2").await.unwrap();

    kv.clear().await.unwrap();
    assert!(kv.get("a").await.is_err());

    kv.set("a", "1").await.unwrap();
    kv.remove().await.unwrap();
    assert!(kv.get("a").await.is_err());
}

#[tokio::test]
async fn test_set_operations() {
    let host = test_backend().await;
    let set = host.creator().new_set("members").await.unwrap();

    set.add("carol").await.unwrap();
    set.add("alice").await.unwrap();
    set.add("alice").await.unwrap();
    assert!(set.has("alice").await.unwrap());
    assert!(!set.has("bob").await.unwrap());

    let mut all = set.all().await.unwrap();
    all.sort();
    assert_eq!(all, ["alice", "carol"]);

    set.del("alice").await.unwrap();
    set.del("nobody").await.unwrap();
    assert!(!set.has("alice").await.unwrap());

    set.clear().await.unwrap();
    assert!(set.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_collections_are_namespaced() {
    let host = test_backend().await;
    let creator = host.creator();
    let first = creator.new_set("first").await.unwrap();
    let second = creator.new_set("second").await.unwrap();

    first.add("x").await.unwrap();
    assert!(!second.has("x").await.unwrap());

    // Opening the same id again sees the same data
    let again = creator.new_set("first").await.unwrap();
    assert!(again.has("x").await.unwrap());
}

#[tokio::test]
async fn test_hash_map_rows() {
    let host = test_backend().await;
    let users = host.creator().new_hash_map("people").await.unwrap();

    users.set("bob", "email", "bob@e.co").await.unwrap();
    users.set("bob", "admin", "false").await.unwrap();
    users.set("alice", "email", "alice@e.co").await.unwrap();

    assert_eq!(users.get("bob", "email").await.unwrap(), "bob@e.co");
    assert!(users.has("bob", "admin").await.unwrap());
    assert!(!users.has("bob", "token").await.unwrap());
    assert!(users.exists("alice").await.unwrap());
    assert!(!users.exists("carol").await.unwrap());
    assert!(users.get("carol", "email").await.unwrap_err().is_not_found());

    let mut keys = users.keys("bob").await.unwrap();
    keys.sort();
    assert_eq!(keys, ["admin", "email"]);

    let mut owners = users.all().await.unwrap();
    owners.sort();
    assert_eq!(owners, ["alice", "bob"]);

    users.del_key("bob", "admin").await.unwrap();
    assert_eq!(users.keys("bob").await.unwrap(), ["email"]);

    users.del("bob").await.unwrap();
    assert!(!users.exists("bob").await.unwrap());
    assert!(users.keys("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hash_map_field_with_ttl() {
    let host = test_backend().await;
    let users = host.creator().new_hash_map("tokens").await.unwrap();
    assert_eq!(users.supports_field_expiry(), backend_expires_fields());

    // Within its lifetime the value reads back on every backend
    users
        .set_expire("bob", "token", "abc", Duration::from_secs(3600))
        .await
        .unwrap();
    assert_eq!(users.get("bob", "token").await.unwrap(), "abc");
}

#[tokio::test]
async fn test_list_operations() {
    let host = test_backend().await;
    let log = host.creator().new_list("events").await.unwrap();

    assert!(log.last().await.unwrap_err().is_not_found());
    assert!(log.last_n(3).await.unwrap().is_empty());

    for item in ["one", "two", "three", "four"] {
        log.add(item).await.unwrap();
    }
    assert_eq!(log.all().await.unwrap(), ["one", "two", "three", "four"]);
    assert_eq!(log.last().await.unwrap(), "four");
    assert_eq!(log.last_n(2).await.unwrap(), ["three", "four"]);
    assert_eq!(log.last_n(10).await.unwrap().len(), 4);

    log.clear().await.unwrap();
    assert!(log.all().await.unwrap().is_empty());
}
