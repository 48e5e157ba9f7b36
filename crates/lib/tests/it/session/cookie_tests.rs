use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use base64ct::{Base64UrlUnpadded, Encoding};
use tollgate::{StateConfig, UserState, backend::InMemory};

use crate::helpers::{cookie_header, fast_config, replay, state_with_bob, user_cookie_value};

#[tokio::test]
async fn test_cookie_round_trip() {
    let state = state_with_bob().await;
    let mut response = HeaderMap::new();
    state.set_username_cookie(&mut response, "bob").await.unwrap();

    let header = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(header.starts_with("user="));
    assert!(header.contains("Path=/"));
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("Expires="));

    let request = replay(&response);
    assert_eq!(state.username_cookie(&request).unwrap(), "bob");
    assert_eq!(state.username(&request), "bob");
}

#[tokio::test]
async fn test_no_cookie_means_no_username() {
    let state = state_with_bob().await;
    let request = HeaderMap::new();
    assert_eq!(state.username(&request), "");
    assert!(state.username_cookie(&request).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_refused_cookies_emit_nothing() {
    let state = state_with_bob().await;
    let mut response = HeaderMap::new();
    assert!(state.set_username_cookie(&mut response, "").await.is_err());
    assert!(state.set_username_cookie(&mut response, "mallory").await.is_err());
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_flipped_bits_rejected() {
    let state = state_with_bob().await;
    let mut response = HeaderMap::new();
    state.set_username_cookie(&mut response, "bob").await.unwrap();
    let value = user_cookie_value(&response);
    let bytes = Base64UrlUnpadded::decode_vec(&value).unwrap();

    for i in 0..bytes.len() {
        for bit in 0..8 {
            let mut tampered = bytes.clone();
            tampered[i] ^= 1 << bit;
            let request = cookie_header("user", &Base64UrlUnpadded::encode_string(&tampered));
            assert!(state.username_cookie(&request).is_err(), "byte {i} bit {bit}");
        }
    }
}

#[tokio::test]
async fn test_cookie_bound_to_secret() {
    let state = state_with_bob().await;
    let mut response = HeaderMap::new();
    state.set_username_cookie(&mut response, "bob").await.unwrap();

    let other = UserState::with_config(Arc::new(InMemory::new()), fast_config())
        .await
        .unwrap();
    assert!(other.username_cookie(&replay(&response)).is_err());
}

#[tokio::test]
async fn test_cookie_stable_across_restart() {
    let backend = InMemory::new();
    let config = StateConfig {
        cookie_secret: Some("shared-secret".to_string()),
        ..fast_config()
    };
    let first = UserState::with_config(Arc::new(backend.clone()), config.clone())
        .await
        .unwrap();
    first.add_user("bob", "pw", "b@e").await.unwrap();
    let mut response = HeaderMap::new();
    first.set_username_cookie(&mut response, "bob").await.unwrap();

    let second = UserState::with_config(Arc::new(backend), config)
        .await
        .unwrap();
    assert_eq!(second.username_cookie(&replay(&response)).unwrap(), "bob");
}

#[tokio::test]
async fn test_clear_cookie_header() {
    let state = state_with_bob().await;
    let mut response = HeaderMap::new();
    state.clear_cookie(&mut response).unwrap();
    let header = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(header.starts_with("user=;"));
    assert!(header.contains("Max-Age=0"));
}
