use conversion_engine::{ApiConfig, AuthClient, AuthError};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn login_returns_token_and_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "ada@example.com", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-123",
            "user": {"id": 7, "name": "Ada", "email": "ada@example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AuthClient::new(ApiConfig::with_base(server.uri())).unwrap();
    let session = client.login("ada@example.com", "hunter22").await.unwrap();
    assert_eq!(session.token, "tok-123");
    assert_eq!(session.user.id, 7);
    assert_eq!(session.user.name, "Ada");
}

#[tokio::test]
async fn rejected_login_surfaces_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let client = AuthClient::new(ApiConfig::with_base(server.uri())).unwrap();
    let err = client.login("ada@example.com", "nope").await.unwrap_err();
    assert_eq!(
        err,
        AuthError::Rejected {
            status: 401,
            detail: "Invalid credentials".to_string(),
        }
    );
}

#[tokio::test]
async fn reset_password_sends_token_and_new_password() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/reset-password"))
        .and(body_json(json!({"token": "reset-1", "new_password": "s3cret!"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Password updated"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = AuthClient::new(ApiConfig::with_base(server.uri())).unwrap();
    let message = client.reset_password("reset-1", "s3cret!").await.unwrap();
    assert_eq!(message, "Password updated");
}

#[tokio::test]
async fn unexpected_success_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = AuthClient::new(ApiConfig::with_base(server.uri())).unwrap();
    let err = client.forgot_password("ada@example.com").await.unwrap_err();
    assert!(matches!(err, AuthError::Malformed(_)));
}
