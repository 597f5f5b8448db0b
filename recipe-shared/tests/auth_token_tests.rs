/// Integration tests for token issuing and request authentication

mod common;

use axum::http::{header, HeaderMap, HeaderValue};
use common::{create_user, setup_pool};
use recipe_shared::auth::middleware::{authenticate, AuthError};
use recipe_shared::auth::token::hash_token;
use recipe_shared::models::auth_token::{AuthToken, MAX_TOKENS_PER_USER};

fn headers_with(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
}

#[tokio::test]
async fn test_issue_stores_only_the_hash() {
    let pool = setup_pool().await;
    let user = create_user(&pool, "user@example.com").await;

    let (token, plaintext) = AuthToken::issue(&pool, user.id).await.unwrap();

    assert_eq!(token.user_id, user.id);
    assert_eq!(token.token_hash, hash_token(&plaintext));
    assert!(plaintext.starts_with(&token.token_prefix));
    assert!(token.last_used_at.is_none());

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_tokens WHERE token_hash = ?")
        .bind(&plaintext)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 0, "Plaintext must never be stored");
}

#[tokio::test]
async fn test_each_login_issues_a_new_token() {
    let pool = setup_pool().await;
    let user = create_user(&pool, "user@example.com").await;

    let (_, first) = AuthToken::issue(&pool, user.id).await.unwrap();
    let (_, second) = AuthToken::issue(&pool, user.id).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(AuthToken::list_by_user(&pool, user.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_issue_revokes_oldest_tokens_past_limit() {
    let pool = setup_pool().await;
    let user = create_user(&pool, "user@example.com").await;
    let other = create_user(&pool, "other@example.com").await;

    let (_, other_token) = AuthToken::issue(&pool, other.id).await.unwrap();

    let mut issued = Vec::new();
    for _ in 0..MAX_TOKENS_PER_USER + 2 {
        let (_, plaintext) = AuthToken::issue(&pool, user.id).await.unwrap();
        issued.push(plaintext);
    }

    let stored = AuthToken::list_by_user(&pool, user.id).await.unwrap();
    assert_eq!(stored.len() as i64, MAX_TOKENS_PER_USER);

    assert!(AuthToken::authenticate(&pool, &issued[0]).await.unwrap().is_none());
    assert!(AuthToken::authenticate(&pool, &issued[1]).await.unwrap().is_none());
    assert!(AuthToken::authenticate(&pool, &issued[2]).await.unwrap().is_some());
    assert!(AuthToken::authenticate(&pool, issued.last().unwrap()).await.unwrap().is_some());

    // Another user's tokens are untouched
    assert!(AuthToken::authenticate(&pool, &other_token).await.unwrap().is_some());
}

#[tokio::test]
async fn test_authenticate_token_and_bearer_headers() {
    let pool = setup_pool().await;
    let user = create_user(&pool, "user@example.com").await;
    let (_, plaintext) = AuthToken::issue(&pool, user.id).await.unwrap();

    for scheme in ["Token", "Bearer"] {
        let headers = headers_with(&format!("{} {}", scheme, plaintext));
        let context = authenticate(&pool, &headers).await.unwrap();

        assert_eq!(context.user_id, user.id);
        assert_eq!(context.email, "user@example.com");
    }

    let tokens = AuthToken::list_by_user(&pool, user.id).await.unwrap();
    assert!(tokens[0].last_used_at.is_some());
}

#[tokio::test]
async fn test_authenticate_rejects_bad_credentials() {
    let pool = setup_pool().await;
    let user = create_user(&pool, "user@example.com").await;
    let (_, plaintext) = AuthToken::issue(&pool, user.id).await.unwrap();

    let missing = authenticate(&pool, &HeaderMap::new()).await;
    assert!(matches!(missing, Err(AuthError::MissingCredentials)));

    let basic = authenticate(&pool, &headers_with("Basic dXNlcjpwYXNz")).await;
    assert!(matches!(basic, Err(AuthError::InvalidFormat)));

    let unknown = authenticate(&pool, &headers_with(&format!("Token {}", "a".repeat(40)))).await;
    assert!(matches!(unknown, Err(AuthError::InvalidToken)));

    let malformed = authenticate(&pool, &headers_with("Token not-a-token")).await;
    assert!(matches!(malformed, Err(AuthError::InvalidToken)));

    let valid = authenticate(&pool, &headers_with(&format!("Token {}", plaintext))).await;
    assert!(valid.is_ok());
}

#[tokio::test]
async fn test_inactive_user_cannot_authenticate() {
    let pool = setup_pool().await;
    let user = create_user(&pool, "user@example.com").await;
    let (_, plaintext) = AuthToken::issue(&pool, user.id).await.unwrap();

    sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(AuthToken::authenticate(&pool, &plaintext).await.unwrap().is_none());
}

#[tokio::test]
async fn test_tokens_die_with_their_user() {
    let pool = setup_pool().await;
    let user = create_user(&pool, "user@example.com").await;
    let (_, plaintext) = AuthToken::issue(&pool, user.id).await.unwrap();

    recipe_shared::models::user::User::delete(&pool, user.id).await.unwrap();

    assert!(AuthToken::authenticate(&pool, &plaintext).await.unwrap().is_none());
    assert!(AuthToken::list_by_user(&pool, user.id).await.unwrap().is_empty());
}
