//! Composed credential flows: hashing, registration, login and token
//! lifecycle across `CredentialService` and `Store` together.

use podlog::config::{AuthConfig, LimitsConfig};
use podlog::db::{NewUser, Store};
use podlog::error::Error;
use podlog::{Claims, CredentialService};

fn credential_service() -> CredentialService {
    // Cheap Argon2 params keep the hashing in these flows fast.
    let config = AuthConfig {
        token_secret: "0123456789abcdef0123456789abcdef".to_string(),
        session_ttl_minutes: 30,
        remember_ttl_days: 30,
        argon2_memory_cost_kib: 16,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
    };
    CredentialService::new(&config).expect("failed to build credential service")
}

async fn test_store() -> Store {
    let db_path = std::env::temp_dir().join(format!("podlog-test-{}.db", uuid::Uuid::new_v4()));
    Store::with_pool_options(
        &format!("sqlite:{}", db_path.display()),
        5,
        1,
        LimitsConfig::default(),
    )
    .await
    .expect("failed to open test store")
}

#[tokio::test]
async fn full_login_flow() {
    let credentials = credential_service();
    let store = test_store().await;

    // Registration: policy-check and hash the password, then persist.
    let hash = credentials
        .hash_password("correct horse battery")
        .await
        .unwrap();
    let user = store
        .create_user(NewUser {
            username: "Carol".to_string(),
            email: Some("carol@example.com".to_string()),
            password_hash: hash,
        })
        .await
        .unwrap();

    // Login: look the user up by whatever casing they typed.
    let found = store
        .get_user_by_username("  CAROL ")
        .await
        .unwrap()
        .expect("registered user");
    assert_eq!(found.id, user.id);

    assert!(
        credentials
            .verify_password("correct horse battery", &found.password_hash)
            .await
            .unwrap()
    );
    assert!(
        !credentials
            .verify_password("incorrect horse battery", &found.password_hash)
            .await
            .unwrap()
    );

    // Session: mint a token, then resolve it back to the same user.
    let token = credentials
        .issue_token(found.id, &found.username, false)
        .unwrap();
    let claims = credentials.verify_token(&token).unwrap();
    assert_eq!(claims.user_id().unwrap(), user.id);
    assert_eq!(claims.username, "carol");
}

#[tokio::test]
async fn weak_password_never_reaches_the_store() {
    let credentials = credential_service();
    let store = test_store().await;

    let err = credentials.hash_password("short").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Registration stops at the hashing step, so no row exists.
    assert!(store.get_user_by_username("dave").await.unwrap().is_none());
}

#[tokio::test]
async fn change_password_flow() {
    let credentials = credential_service();
    let store = test_store().await;

    let old_hash = credentials.hash_password("original secret").await.unwrap();
    let user = store
        .create_user(NewUser {
            username: "erin".to_string(),
            email: None,
            password_hash: old_hash,
        })
        .await
        .unwrap();

    let new_hash = credentials.hash_password("replacement secret").await.unwrap();
    store
        .change_password(user.id, user.id, new_hash)
        .await
        .unwrap();

    let refreshed = store.get_user(user.id).await.unwrap().expect("user");
    assert!(
        !credentials
            .verify_password("original secret", &refreshed.password_hash)
            .await
            .unwrap()
    );
    assert!(
        credentials
            .verify_password("replacement secret", &refreshed.password_hash)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn remembered_session_survives_a_refresh() {
    let credentials = credential_service();
    let store = test_store().await;

    let hash = credentials.hash_password("correct horse battery").await.unwrap();
    let user = store
        .create_user(NewUser {
            username: "frank".to_string(),
            email: None,
            password_hash: hash,
        })
        .await
        .unwrap();

    let token = credentials.issue_token(user.id, &user.username, true).unwrap();
    let claims = credentials.verify_token(&token).unwrap();

    let refreshed_token = credentials.refresh_token(&claims).unwrap();
    let refreshed: Claims = credentials.verify_token(&refreshed_token).unwrap();

    assert_eq!(refreshed.user_id().unwrap(), user.id);
    assert_eq!(refreshed.ceil, claims.ceil);
    assert!(refreshed.exp <= refreshed.ceil);
}

#[tokio::test]
async fn token_outlives_its_deleted_user() {
    let credentials = credential_service();
    let store = test_store().await;

    let hash = credentials.hash_password("correct horse battery").await.unwrap();
    let user = store
        .create_user(NewUser {
            username: "grace".to_string(),
            email: None,
            password_hash: hash,
        })
        .await
        .unwrap();
    let token = credentials.issue_token(user.id, &user.username, false).unwrap();

    assert!(store.delete_user(user.id, user.id).await.unwrap());

    // Tokens are stateless, so the claims still decode; the account they
    // point at is simply gone.
    let claims = credentials.verify_token(&token).unwrap();
    assert!(store.get_user(claims.user_id().unwrap()).await.unwrap().is_none());
}
