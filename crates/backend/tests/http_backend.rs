//! Drives the HTTP client against a canned local responder.

use std::collections::HashMap;
use std::sync::Arc;

use backend::{BackendClient, BackendSettings};
use parking_lot::Mutex;
use session::{AuthError, AuthEvent, IdentityProvider, UserDirectory};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

const USER_ID: &str = "7f1b7a54-3c5e-4a8e-9d52-8f1f0e6b2a11";

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    target: String,
    headers: HashMap<String, String>,
    body: String,
}

type Routes = HashMap<(&'static str, &'static str), (u16, String)>;

struct Responder {
    url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Responder {
    async fn start(routes: Routes) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else { break };
                let Some(request) = read_request(&mut stream).await else { continue };
                let path = request.target.split('?').next().unwrap_or("").to_owned();
                let (status, body) = routes
                    .iter()
                    .find(|((method, route), _)| *method == request.method && *route == path)
                    .map(|(_, reply)| reply.clone())
                    .unwrap_or((404, r#"{"message":"no route"}"#.to_string()));
                log.lock().push(request);
                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        Self { url, requests }
    }

    fn client(&self) -> BackendClient {
        BackendClient::new(&BackendSettings {
            url: self.url.clone(),
            anon_key: "anon-key".into(),
            ..BackendSettings::default()
        })
        .unwrap()
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut start = lines.next()?.split(' ');
    let method = start.next()?.to_owned();
    let target = start.next()?.to_owned();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_owned()))
        .collect();
    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some(Recorded {
        method,
        target,
        headers,
        body,
    })
}

fn token_body() -> String {
    format!(
        r#"{{"access_token":"at-1","token_type":"bearer","expires_in":3600,"refresh_token":"rt-1","user":{{"id":"{USER_ID}","email":"a@b.co"}}}}"#
    )
}

#[tokio::test]
async fn sign_in_then_current_user_uses_bearer_token() {
    let mut routes = Routes::new();
    routes.insert(("POST", "/auth/v1/token"), (200, token_body()));
    routes.insert(
        ("GET", "/auth/v1/user"),
        (200, format!(r#"{{"id":"{USER_ID}","email":"a@b.co"}}"#)),
    );
    let server = Responder::start(routes).await;
    let client = server.client();
    let mut events = client.subscribe();

    let user = client.sign_in_with_password("a@b.co", "secret").await.unwrap();
    assert_eq!(user.id, Uuid::parse_str(USER_ID).unwrap());
    assert_eq!(events.try_recv(), Some(AuthEvent::SignedIn));

    let current = client.current_user().await.unwrap();
    assert_eq!(current, Some(user));

    let requests = server.requests();
    assert_eq!(requests[0].target, "/auth/v1/token?grant_type=password");
    assert_eq!(requests[0].headers["apikey"], "anon-key");
    assert!(requests[0].body.contains(r#""email":"a@b.co""#));
    assert_eq!(requests[1].headers["authorization"], "Bearer at-1");
}

#[tokio::test]
async fn rejected_sign_in_carries_backend_message() {
    let mut routes = Routes::new();
    routes.insert(
        ("POST", "/auth/v1/token"),
        (
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#.into(),
        ),
    );
    let server = Responder::start(routes).await;
    let client = server.client();

    let err = client.sign_in_with_password("a@b.co", "nope").await.unwrap_err();
    assert_eq!(err, AuthError::Rejected("Invalid login credentials".into()));
    assert!(client.stored_session().is_none());
}

#[tokio::test]
async fn profile_insert_targets_user_table() {
    let mut routes = Routes::new();
    routes.insert(("POST", "/rest/v1/user"), (201, String::new()));
    let server = Responder::start(routes).await;
    let client = server.client();

    let id = Uuid::parse_str(USER_ID).unwrap();
    client.insert(id, "a@b.co").await.unwrap();

    let request = &server.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.headers["prefer"], "return=minimal");
    assert_eq!(request.headers["authorization"], "Bearer anon-key");
    let row: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(row["id"], USER_ID);
    assert_eq!(row["email"], "a@b.co");
}

#[tokio::test]
async fn profile_insert_failure_is_reported() {
    let mut routes = Routes::new();
    routes.insert(
        ("POST", "/rest/v1/user"),
        (
            403,
            r#"{"code":"42501","message":"new row violates row-level security policy for table \"user\""}"#
                .into(),
        ),
    );
    let server = Responder::start(routes).await;
    let err = server
        .client()
        .insert(Uuid::new_v4(), "a@b.co")
        .await
        .unwrap_err();
    assert_eq!(
        err.message,
        "new row violates row-level security policy for table \"user\""
    );
}

#[tokio::test]
async fn expired_token_without_refresh_signs_out() {
    let mut routes = Routes::new();
    routes.insert(
        ("POST", "/auth/v1/token"),
        (
            200,
            format!(
                r#"{{"access_token":"at-1","user":{{"id":"{USER_ID}","email":"a@b.co"}}}}"#
            ),
        ),
    );
    routes.insert(
        ("GET", "/auth/v1/user"),
        (401, r#"{"msg":"invalid JWT"}"#.into()),
    );
    let server = Responder::start(routes).await;
    let client = server.client();
    client.sign_in_with_password("a@b.co", "secret").await.unwrap();

    let mut events = client.subscribe();
    assert_eq!(client.current_user().await.unwrap(), None);
    assert_eq!(events.try_recv(), Some(AuthEvent::SignedOut));
    assert!(client.stored_session().is_none());
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = BackendClient::new(&BackendSettings {
        url,
        ..BackendSettings::default()
    })
    .unwrap();
    let err = client.sign_in_with_password("a@b.co", "secret").await.unwrap_err();
    assert!(matches!(err, AuthError::Transport(_)));
}
