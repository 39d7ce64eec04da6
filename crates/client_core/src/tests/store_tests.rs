use super::*;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use shared::{
    domain::MessageId,
    protocol::{Envelope, ListEnvelope},
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct BackendState {
    status: StatusCode,
    list_body: String,
    submit_body: String,
    posts: Arc<Mutex<Vec<RecordedPost>>>,
}

#[derive(Debug, Clone)]
struct RecordedPost {
    content_type: Option<String>,
    body: String,
}

async fn handle_list(State(state): State<BackendState>) -> impl IntoResponse {
    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.list_body.clone(),
    )
}

async fn handle_submit(
    State(state): State<BackendState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.posts.lock().await.push(RecordedPost { content_type, body });
    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.submit_body.clone(),
    )
}

async fn spawn_backend(
    status: StatusCode,
    list_body: &str,
    submit_body: &str,
) -> (Endpoint, Arc<Mutex<Vec<RecordedPost>>>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let posts = Arc::new(Mutex::new(Vec::new()));
    let state = BackendState {
        status,
        list_body: list_body.to_string(),
        submit_body: submit_body.to_string(),
        posts: Arc::clone(&posts),
    };
    let app = Router::new()
        .route("/exec", get(handle_list).post(handle_submit))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let endpoint = Endpoint::parse(&format!("http://{addr}/exec")).expect("endpoint");
    (endpoint, posts)
}

fn store_for(endpoint: Endpoint) -> HttpMessageStore {
    HttpMessageStore::new(StoreConfig::new(endpoint))
}

const SUCCESS: &str = r#"{"status":"success"}"#;

fn failure_body(message: &str) -> String {
    serde_json::to_string(&ListEnvelope::failure(message)).expect("encode failure")
}

#[tokio::test]
async fn list_returns_messages_in_backend_order() {
    let body = r#"{
        "status": "success",
        "messages": [
            {"id": 1, "username": "bob", "message": "hi", "timestamp": "2025-01-01T10:00:00Z"},
            {"id": "row-2", "username": "amy", "message": "yo", "timestamp": "2025-01-02T09:00:00Z"}
        ]
    }"#;
    let (endpoint, _) = spawn_backend(StatusCode::OK, body, SUCCESS).await;

    let messages = store_for(endpoint).list_messages().await.expect("list");

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].username, "bob");
    assert_eq!(messages[1].id, MessageId::Text("row-2".into()));
}

#[tokio::test]
async fn list_keeps_rows_with_non_text_cells() {
    let body = r#"{
        "status": "success",
        "messages": [
            {"id": 1, "username": "bob", "message": "hi", "timestamp": "2025-01-01T10:00:00Z"},
            {"id": 2, "username": "amy", "message": 123, "timestamp": "2025-01-02T09:00:00Z"},
            {"id": null, "username": "carol", "message": "blank id", "timestamp": "2025-01-03T09:00:00Z"}
        ]
    }"#;
    let (endpoint, _) = spawn_backend(StatusCode::OK, body, SUCCESS).await;

    let messages = store_for(endpoint).list_messages().await.expect("list");

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].message, "hi");
    assert_eq!(messages[1].message, "123");
    assert_eq!(messages[2].id, MessageId::blank());
}

#[tokio::test]
async fn list_round_trips_backend_envelope() {
    let expected = vec![Message {
        id: MessageId::Number(9),
        username: "dave".into(),
        message: "from the envelope".into(),
        timestamp: "2025-03-01T00:00:00Z".into(),
    }];
    let body = serde_json::to_string(&Envelope::success(Some(expected.clone()))).expect("encode");
    let (endpoint, _) = spawn_backend(StatusCode::OK, &body, SUCCESS).await;

    let messages = store_for(endpoint).list_messages().await.expect("list");

    assert_eq!(messages, expected);
}

#[tokio::test]
async fn list_without_messages_field_is_empty() {
    let (endpoint, _) = spawn_backend(StatusCode::OK, SUCCESS, SUCCESS).await;
    let messages = store_for(endpoint).list_messages().await.expect("list");
    assert!(messages.is_empty());
}

#[tokio::test]
async fn list_domain_failure_carries_server_message() {
    let body = failure_body("シートが見つかりません");
    let (endpoint, _) = spawn_backend(StatusCode::OK, &body, SUCCESS).await;

    let err = store_for(endpoint).list_messages().await.expect_err("must fail");

    assert_eq!(err, FetchError::Domain("シートが見つかりません".into()));
}

#[tokio::test]
async fn list_domain_failure_without_message_uses_fallback() {
    let (endpoint, _) = spawn_backend(StatusCode::OK, r#"{"status":"error"}"#, SUCCESS).await;

    let err = store_for(endpoint).list_messages().await.expect_err("must fail");

    assert_eq!(err, FetchError::Domain(LIST_FAILED_FALLBACK.into()));
}

#[tokio::test]
async fn envelope_decides_outcome_regardless_of_http_status() {
    let body = failure_body("quota exceeded");
    let (endpoint, _) = spawn_backend(StatusCode::INTERNAL_SERVER_ERROR, &body, &body).await;
    let store = store_for(endpoint);

    let list_err = store.list_messages().await.expect_err("list must fail");
    let submit_err = store
        .submit_message("alice", "hello")
        .await
        .expect_err("submit must fail");

    assert_eq!(list_err, FetchError::Domain("quota exceeded".into()));
    assert_eq!(submit_err, SubmitError::Domain("quota exceeded".into()));
}

#[tokio::test]
async fn non_json_body_is_a_transport_failure() {
    let (endpoint, _) = spawn_backend(StatusCode::OK, "<html>sign in</html>", SUCCESS).await;

    let err = store_for(endpoint).list_messages().await.expect_err("must fail");

    assert!(err.is_transport(), "unexpected error: {err:?}");
    assert!(err.message().contains("invalid response body"), "{err}");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let store = store_for(Endpoint::parse(&format!("http://{addr}/exec")).expect("endpoint"));

    let list_err = store.list_messages().await.expect_err("list must fail");
    let submit_err = store
        .submit_message("alice", "hello")
        .await
        .expect_err("submit must fail");

    assert!(list_err.is_transport());
    assert!(submit_err.is_transport());
}

#[tokio::test]
async fn submit_sends_form_urlencoded_fields() {
    let (endpoint, posts) = spawn_backend(StatusCode::OK, SUCCESS, SUCCESS).await;

    store_for(endpoint)
        .submit_message("alice & bob", "hello <world>")
        .await
        .expect("submit");

    let posts = posts.lock().await.clone();
    assert_eq!(posts.len(), 1);
    assert_eq!(
        posts[0].content_type.as_deref(),
        Some("application/x-www-form-urlencoded")
    );
    let fields: Vec<(String, String)> = url::form_urlencoded::parse(posts[0].body.as_bytes())
        .into_owned()
        .collect();
    assert_eq!(
        fields,
        vec![
            ("username".to_string(), "alice & bob".to_string()),
            ("message".to_string(), "hello <world>".to_string()),
        ]
    );
}

#[tokio::test]
async fn submit_can_send_json_instead() {
    let (endpoint, posts) = spawn_backend(StatusCode::OK, SUCCESS, SUCCESS).await;
    let store = HttpMessageStore::new(
        StoreConfig::new(endpoint).with_submit_encoding(SubmitEncoding::Json),
    );

    store.submit_message("alice", "hello").await.expect("submit");

    let posts = posts.lock().await.clone();
    assert_eq!(posts[0].content_type.as_deref(), Some("application/json"));
    let body: SubmitRequest = serde_json::from_str(&posts[0].body).expect("json body");
    assert_eq!(body.username, "alice");
    assert_eq!(body.message, "hello");
}

#[tokio::test]
async fn submit_ignores_payload_on_success() {
    let body = r#"{"status":"success","messages":"unexpected"}"#;
    let (endpoint, _) = spawn_backend(StatusCode::OK, SUCCESS, body).await;
    store_for(endpoint)
        .submit_message("alice", "hello")
        .await
        .expect("submit");
}

#[tokio::test]
async fn submit_domain_failure_without_message_uses_fallback() {
    let (endpoint, _) = spawn_backend(StatusCode::OK, SUCCESS, r#"{"status":"fail"}"#).await;

    let err = store_for(endpoint)
        .submit_message("alice", "hello")
        .await
        .expect_err("must fail");

    assert_eq!(err, SubmitError::Domain(SUBMIT_FAILED_FALLBACK.into()));
}

#[test]
fn endpoint_rejects_missing_and_placeholder_urls() {
    assert!(matches!(
        Endpoint::parse("   "),
        Err(ConfigError::MissingEndpoint)
    ));
    assert!(matches!(
        Endpoint::parse("https://script.google.com/macros/s/YOUR_DEPLOYMENT_ID/exec"),
        Err(ConfigError::PlaceholderEndpoint(_))
    ));
    assert!(matches!(
        Endpoint::parse("ftp://example.com/board"),
        Err(ConfigError::UnsupportedScheme(scheme)) if scheme == "ftp"
    ));
    assert!(matches!(
        Endpoint::parse("not a url"),
        Err(ConfigError::InvalidEndpoint(_))
    ));
}

#[test]
fn submit_encoding_parses_case_insensitively() {
    assert_eq!("FORM".parse::<SubmitEncoding>().expect("form"), SubmitEncoding::Form);
    assert_eq!(" json ".parse::<SubmitEncoding>().expect("json"), SubmitEncoding::Json);
    assert!("xml".parse::<SubmitEncoding>().is_err());
}
