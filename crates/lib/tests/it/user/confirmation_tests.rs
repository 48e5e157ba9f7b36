use std::collections::HashSet;
use std::sync::Arc;

use tollgate::user::UserError;

use crate::helpers::{state_with_bob, test_state};

#[tokio::test]
async fn test_add_unconfirmed_and_find() {
    let state = state_with_bob().await;
    state.add_unconfirmed("bob", "CODE123").await.unwrap();

    assert!(!state.is_confirmed("bob").await);
    assert_eq!(state.all_unconfirmed_usernames().await.unwrap(), ["bob"]);
    assert_eq!(state.confirmation_code("bob").await.unwrap(), "CODE123");
    assert_eq!(
        state.find_user_by_confirmation_code("CODE123").await.unwrap(),
        "bob"
    );
    assert!(state.find_user_by_confirmation_code("CODE999").await.is_err());
}

#[tokio::test]
async fn test_confirm() {
    let state = state_with_bob().await;
    state.add_unconfirmed("bob", "CODE123").await.unwrap();
    state.confirm("bob").await.unwrap();

    assert!(state.is_confirmed("bob").await);
    assert!(state.all_unconfirmed_usernames().await.unwrap().is_empty());
    assert!(state.confirmation_code("bob").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_remove_unconfirmed_leaves_user_unconfirmed() {
    let state = state_with_bob().await;
    state.add_unconfirmed("bob", "CODE123").await.unwrap();
    state.remove_unconfirmed("bob").await.unwrap();

    assert!(state.has_user("bob").await);
    assert!(!state.is_confirmed("bob").await);
    assert!(!state.already_has_confirmation_code("CODE123").await.unwrap());
}

#[tokio::test]
async fn test_removed_user_code_is_unusable() {
    let state = state_with_bob().await;
    state.add_unconfirmed("bob", "CODE123").await.unwrap();
    state.remove_user("bob").await.unwrap();

    let err = state
        .confirm_user_by_confirmation_code("CODE123")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        tollgate::Error::User(UserError::ConfirmationCodeNotFound)
    ));
}

#[tokio::test]
async fn test_generated_codes_are_unique() {
    let state = test_state().await;
    let mut seen = HashSet::new();
    for i in 0..10 {
        let username = format!("user{i}");
        state.add_user(&username, "pw", "u@e.co").await.unwrap();
        let code = state.generate_unique_confirmation_code().await.unwrap();
        assert!(code.len() >= 20);
        state.add_unconfirmed(&username, &code).await.unwrap();
        assert!(seen.insert(code));
    }
}

#[tokio::test]
async fn test_exhaustion_when_every_length_is_taken() {
    let state = test_state().await;
    state.set_confirmation_code_generator(Arc::new(|n| "x".repeat(n)));
    for length in 20..=100 {
        state
            .add_unconfirmed(&format!("user{length}"), &"x".repeat(length))
            .await
            .unwrap();
    }

    let err = state.generate_unique_confirmation_code().await.unwrap_err();
    assert!(matches!(
        err,
        tollgate::Error::User(UserError::ConfirmationCodesExhausted { min: 20, max: 100 })
    ));
}
