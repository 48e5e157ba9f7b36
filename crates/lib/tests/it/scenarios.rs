//! End-to-end flows through the user store, session and middleware.

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use base64ct::{Base64UrlUnpadded, Encoding};
use tollgate::password::{PasswordAlgorithm, is_sha256_shape};
use tollgate::permissions::PathRules;
use tollgate::{Permissions, StateConfig};
use tower::ServiceExt;

use crate::helpers::{
    cookie_header, fast_config, login_headers, replay, state_with_bob, test_state,
    test_state_with, user_cookie_value,
};

#[tokio::test]
async fn test_register_confirm_login() {
    let state = test_state().await;
    state.add_user("bob", "hunter1", "bob@e.co").await.unwrap();
    state
        .add_unconfirmed("bob", "CODE123abcdefghijklmnop")
        .await
        .unwrap();
    assert!(!state.is_confirmed("bob").await);

    state
        .confirm_user_by_confirmation_code("CODE123abcdefghijklmnop")
        .await
        .unwrap();
    assert!(state.is_confirmed("bob").await);

    let mut response = HeaderMap::new();
    state.login(&mut response, "bob").await.unwrap();
    let request = replay(&response);
    assert!(state.user_rights(&request).await);
    assert_eq!(state.username(&request), "bob");

    // Logging out keeps the cookie valid but revokes the rights it carried
    state.logout("bob").await.unwrap();
    assert_eq!(state.username(&request), "bob");
    assert!(!state.user_rights(&request).await);
}

#[tokio::test]
async fn test_admin_elevation_through_middleware() {
    let state = state_with_bob().await;
    state.set_admin_status("bob").await.unwrap();
    let cookie = login_headers(&state, "bob").await;
    let permissions = Permissions::new(state);

    let app = Router::new()
        .route("/admin/panel", get(|| async { "panel" }))
        .layer(from_fn_with_state(permissions, Permissions::guard));

    let anonymous = axum::http::Request::builder()
        .uri("/admin/panel")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(anonymous).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut with_cookie = axum::http::Request::builder()
        .uri("/admin/panel")
        .body(Body::empty())
        .unwrap();
    *with_cookie.headers_mut() = cookie;
    let response = app.oneshot(with_cookie).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_password_migration() {
    let state = test_state_with(StateConfig {
        password_algorithm: PasswordAlgorithm::Sha256,
        ..fast_config()
    })
    .await;
    state.add_user("alice", "pw", "a@e").await.unwrap();

    state.set_password_algorithm(PasswordAlgorithm::BcryptPlus);
    assert!(state.correct_password("alice", "pw").await);

    state.set_password("alice", "pw").await.unwrap();
    state.set_password_algorithm(PasswordAlgorithm::Bcrypt);
    assert!(state.correct_password("alice", "pw").await);
    assert!(!is_sha256_shape(&state.password_hash("alice").await.unwrap()));
}

#[tokio::test]
async fn test_forged_cookie_rejected() {
    let state = test_state().await;
    state.add_user("carol", "pw", "c@e").await.unwrap();
    let mut response = HeaderMap::new();
    state.login(&mut response, "carol").await.unwrap();

    let mut bytes = Base64UrlUnpadded::decode_vec(&user_cookie_value(&response)).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    let request = cookie_header("user", &Base64UrlUnpadded::encode_string(&bytes));

    assert!(state.username_cookie(&request).is_err());
    assert!(!state.user_rights(&request).await);
}

#[tokio::test]
async fn test_admin_rule_evaluated_first() {
    let state = state_with_bob().await;
    let request = login_headers(&state, "bob").await;
    let permissions = Permissions::with_rules(
        state,
        PathRules {
            admin: vec!["/a".to_string()],
            user: vec!["/a/u".to_string()],
            ..PathRules::default()
        },
    );

    assert!(permissions.rejected(&request, "/a/u/x").await);
}

#[tokio::test]
async fn test_removed_user_cannot_log_back_in() {
    let state = state_with_bob().await;
    let request = login_headers(&state, "bob").await;
    state.remove_user("bob").await.unwrap();

    assert!(!state.user_rights(&request).await);
    assert!(!state.correct_password("bob", "hunter1").await);
    let mut response = HeaderMap::new();
    assert!(state.login(&mut response, "bob").await.is_err());
}
