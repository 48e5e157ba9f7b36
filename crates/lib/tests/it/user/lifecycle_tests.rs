use tollgate::constants::{FIELD_ADMIN, FIELD_CONFIRMED, FIELD_LOGGED_IN};
use tollgate::user::{Flag, UserError, valid_username_password};

use crate::helpers::{state_with_bob, test_state};

#[tokio::test]
async fn test_add_and_remove_user() {
    let state = state_with_bob().await;
    assert!(state.has_user("bob").await);
    assert_eq!(state.all_usernames().await.unwrap(), ["bob"]);

    for flag in [FIELD_LOGGED_IN, FIELD_CONFIRMED, FIELD_ADMIN] {
        assert_eq!(state.flag("bob", flag).await.unwrap(), Flag::False);
    }

    state.remove_user("bob").await.unwrap();
    assert!(!state.has_user("bob").await);
    assert!(!state.correct_password("bob", "hunter1").await);
    assert!(state.all_usernames().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_user_twice_keeps_one_member() {
    let state = state_with_bob().await;
    state.add_user("bob", "other", "new@e.co").await.unwrap();

    assert_eq!(state.all_usernames().await.unwrap(), ["bob"]);
    assert_eq!(state.email("bob").await.unwrap(), "new@e.co");
    assert!(state.correct_password("bob", "other").await);
}

#[tokio::test]
async fn test_boolean_field_needs_membership() {
    let state = test_state().await;
    state
        .set_boolean_field("ghost", FIELD_LOGGED_IN, true)
        .await
        .unwrap();
    assert_eq!(state.flag("ghost", FIELD_LOGGED_IN).await.unwrap(), Flag::True);
    assert!(!state.boolean_field("ghost", FIELD_LOGGED_IN).await);

    state.add_user("ghost", "pw", "g@e.co").await.unwrap();
    state
        .set_boolean_field("ghost", FIELD_LOGGED_IN, true)
        .await
        .unwrap();
    assert!(state.boolean_field("ghost", FIELD_LOGGED_IN).await);
}

#[tokio::test]
async fn test_flag_setters() {
    let state = state_with_bob().await;

    state.set_admin_status("bob").await.unwrap();
    assert!(state.is_admin("bob").await);
    state.remove_admin_status("bob").await.unwrap();
    assert!(!state.is_admin("bob").await);

    state.set_logged_in("bob").await.unwrap();
    assert!(state.is_logged_in("bob").await);
    state.set_logged_out("bob").await.unwrap();
    assert!(!state.is_logged_in("bob").await);

    state.mark_confirmed("bob").await.unwrap();
    assert!(state.is_confirmed("bob").await);
}

#[tokio::test]
async fn test_custom_fields() {
    let state = state_with_bob().await;
    state.set_field("bob", "nickname", "bobby").await.unwrap();
    assert_eq!(state.field("bob", "nickname").await.unwrap(), "bobby");
    assert!(state.properties("bob").await.contains(&"nickname".to_string()));

    state.remove_field("bob", "nickname").await.unwrap();
    let err = state.field("bob", "nickname").await.unwrap_err();
    assert!(matches!(
        err,
        tollgate::Error::User(UserError::FieldNotFound { .. })
    ));

    let err = state.field("alice", "email").await.unwrap_err();
    assert!(matches!(
        err,
        tollgate::Error::User(UserError::UserNotFound { .. })
    ));
}

#[tokio::test]
async fn test_email_lookup() {
    let state = state_with_bob().await;
    state.add_user("alice", "pw", "alice@e.co").await.unwrap();

    assert_eq!(state.has_email("bob@e.co").await.unwrap(), "bob");
    assert_eq!(state.has_email("alice@e.co").await.unwrap(), "alice");
    assert!(state.has_email("nobody@e.co").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_username_validation() {
    assert!(valid_username_password("bob", "hunter1").is_ok());
    assert!(valid_username_password("bad name", "p").is_err());
    assert!(valid_username_password("bob", "bob").is_err());
    assert!(valid_username_password("ærlig_øl", "pw").is_ok());
}

#[tokio::test]
async fn test_clones_share_state() {
    let state = state_with_bob().await;
    let clone = state.clone();
    clone.set_admin_status("bob").await.unwrap();
    assert!(state.is_admin("bob").await);

    clone
        .set_cookie_timeout(std::time::Duration::from_secs(7))
        .unwrap();
    assert_eq!(state.cookie_timeout().as_secs(), 7);
}

#[tokio::test]
async fn test_concurrent_adds() {
    let state = test_state().await;
    let mut handles = Vec::new();
    for i in 0..8 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            state
                .add_user(&format!("user{i}"), "pw", "u@e.co")
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(state.all_usernames().await.unwrap().len(), 8);
}
