//! API gateway behavior against a mock backend.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use expodash_core::auth::{AuthUser, MemoryStore, SESSION_EXPIRED_MESSAGE};
use expodash_core::{
    ApiClient, ApiError, Config, CredentialRecord, CredentialStore, Notifier, SessionConfig,
    SessionManager,
};

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn client_for(base_url: &str) -> (ApiClient, Arc<RecordingNotifier>) {
    client_with_session(
        base_url,
        SessionConfig {
            timeout_seconds: 600,
            ..SessionConfig::default()
        },
    )
}

fn client_with_session(
    base_url: &str,
    session: SessionConfig,
) -> (ApiClient, Arc<RecordingNotifier>) {
    let config = Config {
        api_base_url: base_url.to_string(),
        alerts_base_url: base_url.to_string(),
        session,
        ..Config::default()
    };
    let notifier = Arc::new(RecordingNotifier::default());
    let creds = CredentialStore::new(Arc::new(MemoryStore::new()));
    let session = SessionManager::new(config.session.clone(), creds, notifier.clone());
    let client = ApiClient::new(&config, session).unwrap();
    (client, notifier)
}

fn logged_in(client: &ApiClient) {
    client
        .session()
        .establish(&CredentialRecord::new("abc", AuthUser::new("a@b.com")))
        .unwrap();
}

fn jwt_with_id(id: serde_json::Value) -> String {
    let payload = URL_SAFE_NO_PAD.encode(json!({ "id": id }).to_string());
    format!("eyJhbGciOiJIUzI1NiJ9.{}.signature", payload)
}

#[tokio::test]
async fn attaches_bearer_token() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizers"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"organizer_ID": 1, "fname": "Ada", "lname": "Lovelace", "email": "ada@x.io", "contact_no": "0712345678"},
            {"id": "2", "fname": "Grace", "lname": "Hopper", "email": "grace@x.io", "contact_no": "0787654321"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server.uri());
    logged_in(&client);

    let organizers = client.list_organizers().await?;
    assert_eq!(organizers.len(), 2);
    assert_eq!(organizers[0].id, "1");
    assert_eq!(organizers[1].id, "2");
    assert_eq!(organizers[1].full_name(), "Grace Hopper");
    Ok(())
}

#[tokio::test]
async fn omits_authorization_without_token() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/buildings/filterByTag"))
        .and(query_param("tag", "AI"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (client, _) = client_for(&server.uri());
    let buildings = client.buildings_by_tag("AI").await?;
    assert!(buildings.is_empty());

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    Ok(())
}

#[tokio::test]
async fn concurrent_unauthorized_expires_once() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizers"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "jwt expired"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let (client, notifier) = client_for(&server.uri());
    logged_in(&client);

    let (organizers, alerts, again) = futures::join!(
        client.list_organizers(),
        client.list_alerts(),
        client.list_organizers()
    );

    assert!(matches!(organizers, Err(ApiError::Unauthorized { status: 401 })));
    assert!(matches!(alerts, Err(ApiError::Unauthorized { status: 403 })));
    assert!(matches!(again, Err(ApiError::Unauthorized { .. })));

    assert_eq!(
        notifier.messages.lock().unwrap().as_slice(),
        [SESSION_EXPIRED_MESSAGE]
    );
    assert!(!client.session().is_authenticated());
    assert!(client.session().is_expired());
    Ok(())
}

#[tokio::test]
async fn other_statuses_pass_through() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/organizers/7"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Email already in use"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/organizers/7"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let (client, notifier) = client_for(&server.uri());
    logged_in(&client);

    let update = expodash_core::models::OrganizerUpdate {
        email: Some("ada@x.io".to_string()),
        ..Default::default()
    };
    let err = client.update_organizer("7", &update).await.unwrap_err();
    assert_eq!(err.user_message(), "Email already in use");

    let err = client.delete_organizer("7").await.unwrap_err();
    assert!(matches!(err, ApiError::ServerError(ref body) if body == "boom"));

    // Neither failure touches the session
    assert!(client.session().is_authenticated());
    assert!(notifier.messages.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn transport_failure_keeps_session() {
    // Nothing listens on port 1
    let (client, notifier) = client_for("http://127.0.0.1:1");
    logged_in(&client);

    let err = client.list_alerts().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert!(err.is_retryable());
    assert!(client.session().is_authenticated());
    assert!(notifier.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn login_establishes_session() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = jwt_with_id(json!(42));
    Mock::given(method("POST"))
        .and(path("/auths/login"))
        .and(body_partial_json(json!({"email": "a@b.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })))
        .mount(&server)
        .await;

    let (client, _) = client_for(&server.uri());
    let record = client.login("a@b.com", "pw").await?;

    assert_eq!(record.token, token);
    assert_eq!(record.organizer_id.as_deref(), Some("42"));
    assert!(client.session().is_authenticated());
    assert!(client.session().is_timer_armed());

    let stored = client.session().credentials().load().unwrap();
    assert_eq!(stored.user.email, "a@b.com");
    assert_eq!(stored.organizer_id.as_deref(), Some("42"));
    Ok(())
}

#[tokio::test]
async fn login_with_unusable_timeout_stores_nothing() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auths/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": jwt_with_id(json!(42)) })),
        )
        .mount(&server)
        .await;

    let (client, _) = client_with_session(
        &server.uri(),
        SessionConfig {
            timeout_seconds: u64::MAX,
            ..SessionConfig::default()
        },
    );
    let err = client.login("a@b.com", "pw").await.unwrap_err();

    assert!(matches!(err, ApiError::Session(_)));
    assert!(!client.session().is_authenticated());
    assert!(client.session().token().is_none());
    assert!(!client.session().is_timer_armed());
    Ok(())
}

#[tokio::test]
async fn login_rejection_is_not_expiry() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auths/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (client, notifier) = client_for(&server.uri());
    let err = client.login("a@b.com", "wrong").await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidCredentials));
    assert_eq!(err.user_message(), "Invalid email or password.");
    assert!(!client.session().is_expired());
    assert!(notifier.messages.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn send_alert_posts_trimmed_text() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .and(header("Authorization", "Bearer abc"))
        .and(body_partial_json(json!({"alert": "Hall B closed"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"alert_id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server.uri());
    logged_in(&client);

    client.send_alert("  Hall B closed ").await?;
    let err = client.send_alert("   ").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn register_surfaces_server_message() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auths/register"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Email already exists"})),
        )
        .mount(&server)
        .await;

    let (client, _) = client_for(&server.uri());
    let organizer = expodash_core::models::NewOrganizer {
        fname: "Ada".into(),
        lname: "Lovelace".into(),
        email: "ada@x.io".into(),
        contact_no: "0712345678".into(),
        password: "secret".into(),
    };
    let err = client.register(&organizer).await.unwrap_err();
    assert_eq!(err.user_message(), "Email already exists");
    Ok(())
}

fn new_organizer() -> expodash_core::models::NewOrganizer {
    expodash_core::models::NewOrganizer {
        fname: "Ada".into(),
        lname: "Lovelace".into(),
        email: "ada@x.io".into(),
        contact_no: "0712345678".into(),
        password: "secret".into(),
    }
}

#[tokio::test]
async fn register_falls_back_to_fixed_messages() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let cases = [
        (
            ResponseTemplate::new(400).set_body_json(json!({})),
            "Registration failed. Try again.",
        ),
        (
            ResponseTemplate::new(409).set_body_json(json!({"message": "taken"})),
            "Registration failed. Please try again.",
        ),
        (
            ResponseTemplate::new(500).set_body_string("boom"),
            "Internal server error. Please try again later.",
        ),
    ];

    for (response, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auths/register"))
            .respond_with(response)
            .mount(&server)
            .await;

        let (client, _) = client_for(&server.uri());
        let err = client.register(&new_organizer()).await.unwrap_err();
        assert_eq!(err.user_message(), expected);
    }
    Ok(())
}
