//! Tests for the auth module

use super::*;
use crate::error::Error;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn refresh_config(server: &MockServer) -> AuthConfig {
    AuthConfig::Oauth2Refresh {
        token_url: format!("{}/token", server.uri()),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        refresh_token: "my-refresh-token".to_string(),
    }
}

#[tokio::test]
async fn test_no_auth() {
    let auth = Authenticator::new(AuthConfig::None);
    let client = reqwest::Client::new();
    let req = auth
        .apply(client.get("https://example.com/drive/v3/files"))
        .await
        .unwrap();

    let built = req.build().unwrap();
    assert!(built.headers().get("Authorization").is_none());
}

#[tokio::test]
async fn test_bearer_auth() {
    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "ya29.static".to_string(),
    });

    let client = reqwest::Client::new();
    let req = auth
        .apply(client.get("https://example.com/drive/v3/files"))
        .await
        .unwrap();

    let built = req.build().unwrap();
    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "Bearer ya29.static"
    );
}

#[tokio::test]
async fn test_oauth2_refresh_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=my-refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "refreshed-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(refresh_config(&mock_server));

    let client = reqwest::Client::new();
    let req = auth.apply(client.get("https://example.com/api")).await.unwrap();

    let built = req.build().unwrap();
    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "Bearer refreshed-token"
    );
}

#[tokio::test]
async fn test_token_caching() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "cached-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(refresh_config(&mock_server));
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let _ = auth.apply(client.get("https://example.com/api")).await.unwrap();
    }
}

#[tokio::test]
async fn test_clear_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "token",
            "expires_in": 3600
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(refresh_config(&mock_server));
    let client = reqwest::Client::new();

    let _ = auth.apply(client.get("https://example.com/api")).await.unwrap();
    auth.clear_cache().await;
    let _ = auth.apply(client.get("https://example.com/api")).await.unwrap();
}

#[tokio::test]
async fn test_refresh_error_handling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(refresh_config(&mock_server));
    let client = reqwest::Client::new();
    let err = auth
        .apply(client.get("https://example.com/api"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TokenRefresh { .. }));
    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn test_service_account_rejects_bad_key() {
    let mock_server = MockServer::start().await;

    // A bad key must fail before any exchange request is made
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::ServiceAccount {
        client_email: "reader@project.iam.gserviceaccount.com".to_string(),
        private_key: "not a pem".to_string(),
        scopes: vec![DRIVE_SCOPE.to_string()],
        subject: None,
        token_url: format!("{}/token", mock_server.uri()),
        token_lifetime_seconds: 3600,
    });

    let client = reqwest::Client::new();
    let err = auth
        .apply(client.get("https://example.com/api"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::JwtGeneration { .. }));
    assert!(err.to_string().contains("Invalid private key"));
}

#[test]
fn test_needs_token() {
    assert!(!AuthConfig::None.needs_token());
    assert!(!AuthConfig::Bearer {
        token: "t".to_string()
    }
    .needs_token());
    assert!(AuthConfig::Oauth2Refresh {
        token_url: GOOGLE_TOKEN_URL.to_string(),
        client_id: String::new(),
        client_secret: String::new(),
        refresh_token: String::new(),
    }
    .needs_token());
}

#[test]
fn test_cached_token_expiry() {
    assert!(!CachedToken::expires_in("t".to_string(), 3600).is_expired());
    assert!(CachedToken::expires_in("t".to_string(), -100).is_expired());
    assert!(!CachedToken::new("t".to_string(), None).is_expired());
    // Inside the 30 second buffer
    assert!(CachedToken::expires_in("t".to_string(), 10).is_expired());
}
