use axum::http::HeaderMap;

use crate::helpers::{login_headers, replay, state_with_bob};

#[tokio::test]
async fn test_login_grants_user_rights() {
    let state = state_with_bob().await;
    let request = login_headers(&state, "bob").await;

    assert!(state.is_logged_in("bob").await);
    assert!(state.user_rights(&request).await);
    assert!(!state.admin_rights(&request).await);
}

#[tokio::test]
async fn test_cookie_alone_grants_nothing() {
    let state = state_with_bob().await;
    let mut response = HeaderMap::new();
    state.set_username_cookie(&mut response, "bob").await.unwrap();
    let request = replay(&response);

    assert!(!state.user_rights(&request).await);
}

#[tokio::test]
async fn test_logout_revokes_rights() {
    let state = state_with_bob().await;
    let request = login_headers(&state, "bob").await;
    state.logout("bob").await.unwrap();

    assert_eq!(state.username(&request), "bob");
    assert!(!state.user_rights(&request).await);
}

#[tokio::test]
async fn test_admin_rights() {
    let state = state_with_bob().await;
    state.set_admin_status("bob").await.unwrap();
    let request = login_headers(&state, "bob").await;

    assert!(state.admin_rights(&request).await);
    state.logout("bob").await.unwrap();
    assert!(!state.admin_rights(&request).await);
}

#[tokio::test]
async fn test_login_unknown_user_keeps_flag() {
    let state = state_with_bob().await;
    let mut response = HeaderMap::new();
    let err = state.login(&mut response, "ghost").await.unwrap_err();
    assert!(err.is_configuration_error());
    assert!(response.is_empty());
    // The flag write happened before the cookie was refused
    assert!(
        state
            .flag("ghost", tollgate::constants::FIELD_LOGGED_IN)
            .await
            .unwrap()
            .is_true()
    );
}
