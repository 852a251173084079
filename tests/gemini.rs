//! Full path against a local Gemini stand-in: file → session → HTTP → answer.

mod common;

use common::pdf_bytes;
use docusearch::{ErrorKind, MediaType, QueryConfig, QueryStatus, Session, UploadedFile};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn session_for(server: &MockServer) -> Session {
    let config = QueryConfig::builder()
        .api_key("integration-key")
        .endpoint(server.uri())
        .api_timeout_secs(5)
        .build()
        .unwrap();
    Session::from_config(config).unwrap()
}

#[tokio::test]
async fn pdf_question_is_answered_from_gemini() {
    common::init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "integration-key"))
        .respond_with(|req: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
            let reply = if prompt.contains("Port 8443") {
                "Le serveur écoute sur le port 8443."
            } else {
                "L'information n'est pas présente."
            };
            ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": reply }] } }]
            }))
        })
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    session
        .select_file(UploadedFile::new(
            "ops.pdf",
            MediaType::Pdf,
            pdf_bytes(&["Deployment", "Port 8443"]),
        ))
        .await;
    session.ask("Quel port ?").await;

    let snap = session.snapshot();
    assert_eq!(snap.query_status, QueryStatus::Done);
    assert_eq!(snap.answer.as_deref(), Some("Le serveur écoute sur le port 8443."));
}

#[tokio::test]
async fn rejected_key_surfaces_as_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": 401, "message": "Request had invalid authentication credentials." }
        })))
        .mount(&server)
        .await;

    let session = session_for(&server);
    session
        .select_file(UploadedFile::new("a.txt", MediaType::PlainText, b"text".to_vec()))
        .await;
    session.ask("q").await;

    let err = session.snapshot().search_error.unwrap();
    assert_eq!(err.kind, ErrorKind::InvalidCredentials);
}

#[tokio::test]
async fn validation_failure_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = session_for(&server);
    session.ask("no document loaded").await;
    assert_eq!(
        session.snapshot().search_error.unwrap().kind,
        ErrorKind::Validation
    );
}
