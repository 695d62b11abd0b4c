use std::rc::Rc;

use super::*;
use crate::net::test_helpers::*;
use crate::state::session::{SESSION_KEY, SessionStore};
use crate::util::auth::{RouteDecision, can_enter_protected};

fn credentials() -> Credentials {
    Credentials::username("validuser", "correctpw")
}

// =============================================================================
// validate_login_form
// =============================================================================

#[test]
fn form_accepts_lowercase_username_and_long_password() {
    assert_eq!(validate_login_form("validuser", "correctpw"), Ok(()));
}

#[test]
fn form_rejects_short_username() {
    let err = validate_login_form("ana", "correctpw").unwrap_err();
    let expected = "El nombre de usuario debe tener al menos 5 caracteres";
    assert_eq!(err, LoginError::Invalid(expected));
}

#[test]
fn form_rejects_non_lowercase_username() {
    let err = validate_login_form("Admin1", "correctpw").unwrap_err();
    assert!(matches!(err, LoginError::Invalid(_)));
    let err = validate_login_form("admín", "correctpw").unwrap_err();
    assert!(matches!(err, LoginError::Invalid(_)));
}

#[test]
fn form_rejects_short_or_missing_password() {
    let err = validate_login_form("validuser", "").unwrap_err();
    assert_eq!(err, LoginError::Invalid("La contraseña es obligatoria"));
    let err = validate_login_form("validuser", "12345").unwrap_err();
    let expected = "La contraseña debe tener al menos 6 caracteres";
    assert_eq!(err, LoginError::Invalid(expected));
}

// =============================================================================
// submit
// =============================================================================

#[tokio::test]
async fn successful_login_stores_session_and_opens_guard() {
    let client = logged_out_client(vec![reply(200, session_body("A1", "R1"))]);
    let flow = LoginFlow::new(&client);

    let session = flow.submit(&credentials()).await.unwrap();
    assert_eq!(session.access_token, "A1");
    assert!(client.store().is_logged_in());
    assert_eq!(client.access_token().as_deref(), Some("A1"));
    assert_eq!(can_enter_protected(client.store()), RouteDecision::Allow);
}

#[tokio::test]
async fn submit_posts_credentials_once() {
    let client = logged_out_client(vec![reply(200, session_body("A1", "R1"))]);
    let flow = LoginFlow::new(&client);
    flow.submit(&credentials()).await.unwrap();

    let requests = client.transport().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, LOGIN_URL);
    assert_eq!(requests[0].method, Method::Post);
    let raw = requests[0].body.as_deref().unwrap();
    let body: serde_json::Value = serde_json::from_str(raw).unwrap();
    let expected = serde_json::json!({ "username": "validuser", "password": "correctpw" });
    assert_eq!(body, expected);
}

#[tokio::test]
async fn legacy_token_field_is_accepted() {
    let body = serde_json::json!({
        "token": "A1",
        "refreshToken": "R1",
        "user": { "id": "u1", "name": "Ana", "email": "ana@example.com", "role": "admin" }
    });
    let client = logged_out_client(vec![reply(200, body.to_string())]);
    let flow = LoginFlow::new(&client);
    flow.submit(&credentials()).await.unwrap();
    assert_eq!(client.access_token().as_deref(), Some("A1"));
}

#[tokio::test]
async fn empty_fields_are_rejected_without_request() {
    let client = logged_out_client(vec![]);
    let flow = LoginFlow::new(&client);

    let no_username = Credentials::username("", "pw");
    let err = flow.submit(&no_username).await.unwrap_err();
    assert!(matches!(err, LoginError::Invalid(_)));

    let no_password = Credentials::email("ana@example.com", "");
    let err = flow.submit(&no_password).await.unwrap_err();
    assert!(matches!(err, LoginError::Invalid(_)));

    assert!(client.transport().requests().is_empty());
}

#[tokio::test]
async fn rejection_carries_server_message() {
    let body = r#"{"message":"Usuario o contraseña incorrectos"}"#;
    let client = logged_out_client(vec![reply(401, body)]);
    let flow = LoginFlow::new(&client);
    let err = flow.submit(&credentials()).await.unwrap_err();
    assert_eq!(
        err,
        LoginError::Rejected {
            status: 401,
            message: "Usuario o contraseña incorrectos".to_owned(),
        }
    );
    assert!(!client.store().is_logged_in());
}

#[tokio::test]
async fn rejection_without_message_is_generic() {
    let client = logged_out_client(vec![reply(500, "<html>")]);
    let flow = LoginFlow::new(&client);
    let err = flow.submit(&credentials()).await.unwrap_err();
    assert_eq!(
        err,
        LoginError::Rejected {
            status: 500,
            message: GENERIC_LOGIN_ERROR.to_owned(),
        }
    );
}

#[tokio::test]
async fn failed_login_leaves_prior_session_intact() {
    let body = r#"{"message":"bad credentials"}"#;
    let client = logged_in_client(vec![reply(401, body)]);
    let before = client.store().load_session();

    let flow = LoginFlow::new(&client);
    let err = flow.submit(&credentials()).await.unwrap_err();
    assert!(matches!(err, LoginError::Rejected { status: 401, .. }));
    assert_eq!(client.store().load_session(), before);
    assert!(client.store().is_logged_in());
}

#[tokio::test]
async fn rejected_record_write_keeps_prior_session() {
    let storage = Rc::new(RejectingStorage::default());
    let store = SessionStore::new(storage.clone());
    store.begin(&session("A1", "R1")).unwrap();
    let transport = ScriptedTransport::new(vec![reply(200, session_body("A2", "R2"))]);
    let client = AuthClient::new(transport, store, endpoints());

    storage.reject_key.set(Some(SESSION_KEY));
    let flow = LoginFlow::new(&client);
    let err = flow.submit(&credentials()).await.unwrap_err();

    assert!(matches!(err, LoginError::Storage(StorageError::Write(_))));
    assert!(client.store().is_logged_in());
    assert_eq!(client.access_token().as_deref(), Some("A1"));
    assert_eq!(client.refresh_token().as_deref(), Some("R1"));
}

#[tokio::test]
async fn malformed_success_body_stores_nothing() {
    let client = logged_out_client(vec![reply(200, r#"{"ok":true}"#)]);
    let flow = LoginFlow::new(&client);
    let err = flow.submit(&credentials()).await.unwrap_err();
    assert!(matches!(err, LoginError::MalformedResponse(_)));
    assert!(client.store().load_session().is_none());
}

#[tokio::test]
async fn transport_failure_is_reported() {
    let timeout = TransportError::Timeout { secs: 30 };
    let client = logged_out_client(vec![Err(timeout.clone())]);
    let flow = LoginFlow::new(&client);
    let err = flow.submit(&credentials()).await.unwrap_err();
    assert_eq!(err, LoginError::Transport(timeout));
}

// =============================================================================
// in-flight latch
// =============================================================================

#[tokio::test]
async fn second_submit_while_pending_is_refused() {
    let mut transport = ScriptedTransport::new(vec![reply(200, session_body("A1", "R1"))]);
    transport.yield_first = true;
    let client = AuthClient::new(transport, SessionStore::in_memory(), endpoints());
    let flow = LoginFlow::new(&client);
    let creds = credentials();

    let (first, second) = tokio::join!(flow.submit(&creds), flow.submit(&creds));
    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), LoginError::AlreadySubmitting);
    assert_eq!(client.transport().requests().len(), 1);
    assert!(!flow.is_submitting());
}

#[tokio::test]
async fn latch_is_released_after_failure() {
    let client = logged_out_client(vec![
        reply(401, ""),
        reply(200, session_body("A1", "R1")),
    ]);
    let flow = LoginFlow::new(&client);
    assert!(flow.submit(&credentials()).await.is_err());
    assert!(!flow.is_submitting());
    assert!(flow.submit(&credentials()).await.is_ok());
    assert_eq!(client.transport().requests().len(), 2);
}
