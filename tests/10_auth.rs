mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{RecordingMailer, TestServer};
use research_hub_api::database::Store;

#[tokio::test]
async fn register_verify_then_login() -> Result<()> {
    let server = TestServer::start().await?;
    let (email, verification) = server.register("ada", "researcher").await?;

    let (status, body) = server.login(&email, "secret123").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Please verify your email before logging in");

    let (status, body) = server.get(&format!("/api/auth/verify-email/{}", verification), None).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["isEmailVerified"], true);

    // single use
    let (status, body) = server.get(&format!("/api/auth/verify-email/{}", verification), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired verification token");

    let (status, body) = server.login(&email, "secret123").await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Login successful");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let (status, body) = server.get("/api/user/profile", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "ada");
    assert_eq!(body["data"]["role"], "researcher");
    Ok(())
}

#[tokio::test]
async fn registration_validates_input() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "ab", "email": "nope", "password": "123", "affiliation": "X", "role": "administrator" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors: Vec<&str> = body["errors"].as_array().unwrap().iter().filter_map(|e| e.as_str()).collect();
    assert!(errors.contains(&"Username must be at least 3 characters long"));
    assert!(errors.contains(&"Please provide a valid email address"));
    assert!(errors.contains(&"Password must be at least 6 characters long"));
    assert!(errors.contains(&"Role must be either researcher or academic_manager"));

    server.register("grace", "academic_manager").await?;
    let (status, _) = server
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "grace2", "email": "grace@example.org", "password": "secret123", "affiliation": "Lab" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user("alan").await?;

    let (status, wrong) = server.login(&user.email, "not-it").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, unknown) = server.login("nobody@example.org", "secret123").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["message"], unknown["message"]);
    Ok(())
}

#[tokio::test]
async fn resend_verification_rules() -> Result<()> {
    let server = TestServer::start().await?;
    let (email, first) = server.register("edsger", "researcher").await?;

    let (status, _) = server
        .post("/api/auth/resend-verification", None, json!({ "email": "ghost@example.org" }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .post("/api/auth/resend-verification", None, json!({ "email": email }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let second = server.mailer.token_for(&email, "verify-email").unwrap();
    assert_ne!(first, second);

    // the replaced token no longer works
    let (status, _) = server.get(&format!("/api/auth/verify-email/{}", first), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = server.get(&format!("/api/auth/verify-email/{}", second), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .post("/api/auth/resend-verification", None, json!({ "email": email }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is already verified");
    Ok(())
}

#[tokio::test]
async fn password_reset_round_trip() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user("barbara").await?;

    let (status, _) = server
        .post("/api/auth/forgot-password", None, json!({ "email": user.email }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let reset = server.mailer.token_for(&user.email, "reset-password").unwrap();

    let (status, _) = server
        .post(&format!("/api/auth/reset-password/{}", reset), None, json!({ "newPassword": "123" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post(&format!("/api/auth/reset-password/{}", reset), None, json!({ "newPassword": "fresh-pass" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, _) = server.login(&user.email, "secret123").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = server.login(&user.email, "fresh-pass").await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .post(&format!("/api/auth/reset-password/{}", reset), None, json!({ "newPassword": "again-pass" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired password reset token");
    Ok(())
}

#[tokio::test]
async fn failed_reset_mail_clears_the_token() -> Result<()> {
    let server = TestServer::start_with(RecordingMailer::failing()).await?;

    // registration survives a mail failure
    let (status, _) = server
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "donald", "email": "donald@example.org", "password": "secret123", "affiliation": "Stanford" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = server
        .post("/api/auth/forgot-password", None, json!({ "email": "donald@example.org" }))
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to send password reset email. Please try again.");

    let user = server.store.find_user_by_email("donald@example.org").await?.unwrap();
    assert!(user.reset_password_token.is_none());
    assert!(user.reset_password_expires.is_none());
    Ok(())
}

#[tokio::test]
async fn bad_tokens_are_rejected() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server.get("/api/user/profile", Some("not-a-jwt")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");

    let (status, _) = server.get("/api/user/profile", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
