//! Drives `WorkspaceClient` against a loopback HTTP stub.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use genie_client::{ClientError, SecretStore, SpaceSource, WorkspaceClient};
use genie_core::{SpaceId, WorkspaceAuth};
use serde_json::json;

/// A request as seen by the stub: request line plus the Authorization header.
#[derive(Debug, Clone)]
struct Seen {
    request_line: String,
    authorization: Option<String>,
    body: String,
}

/// Serve one canned `(status, body)` response per expected request, in order.
fn serve(responses: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<Seen>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    thread::spawn(move || {
        for (status, body) in responses {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            let mut authorization = None;
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                let (name, value) = line.split_once(':').expect("header format");
                match name.to_ascii_lowercase().as_str() {
                    "authorization" => authorization = Some(value.trim().to_string()),
                    "content-length" => content_length = value.trim().parse().expect("length"),
                    _ => {}
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).expect("body");
            log.lock().unwrap().push(Seen {
                request_line: request_line.trim_end().to_string(),
                authorization,
                body: String::from_utf8_lossy(&request_body).into_owned(),
            });

            let mut stream = stream;
            let reply = format!(
                "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).expect("write");
            stream.flush().expect("flush");
        }
    });

    (format!("http://{addr}"), seen)
}

fn client(host: &str) -> WorkspaceClient {
    WorkspaceClient::new(&WorkspaceAuth::new(host, "dapi-stub-token").unwrap()).unwrap()
}

#[test]
fn fetch_requests_serialized_form_with_bearer_token() {
    let serialized = json!({"version": 2, "config": {"sample_questions": []}}).to_string();
    let body = json!({"space_id": "abc123", "serialized_space": serialized}).to_string();
    let (host, seen) = serve(vec![(200, body)]);

    let doc = client(&host)
        .fetch_space_config(&SpaceId::from("abc123"))
        .expect("fetch");
    assert_eq!(doc["version"], 2);

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen[0].request_line,
        "GET /api/2.0/genie/spaces/abc123?include_serialized_space=true HTTP/1.1"
    );
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer dapi-stub-token"));
}

#[test]
fn fetch_without_serialized_space_returns_empty_document() {
    let (host, _) = serve(vec![(200, json!({"space_id": "abc123"}).to_string())]);
    let doc = client(&host)
        .fetch_space_config(&SpaceId::from("abc123"))
        .expect("fetch");
    assert_eq!(doc, json!({}));
}

#[test]
fn auth_failure_surfaces_status_and_body() {
    let (host, _) = serve(vec![(
        403,
        json!({"error_code": "PERMISSION_DENIED", "message": "nope"}).to_string(),
    )]);
    let err = client(&host)
        .fetch_space_config(&SpaceId::from("abc123"))
        .unwrap_err();
    match &err {
        ClientError::Status { status, body, .. } => {
            assert_eq!(*status, 403);
            assert!(body.contains("PERMISSION_DENIED"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.to_string().contains("dapi-stub-token"));
}

#[test]
fn secret_is_base64_decoded() {
    // "ghp_token" in base64
    let (host, seen) = serve(vec![(200, json!({"key": "git-pat", "value": "Z2hwX3Rva2Vu"}).to_string())]);
    let secret = client(&host).get_secret("genie_scope", "git-pat").expect("secret");
    assert_eq!(secret.expose(), "ghp_token");
    let seen = seen.lock().unwrap();
    assert_eq!(
        seen[0].request_line,
        "GET /api/2.0/secrets/get?scope=genie_scope&key=git-pat HTTP/1.1"
    );
}

#[test]
fn list_spaces_follows_pagination() {
    let (host, seen) = serve(vec![
        (
            200,
            json!({"spaces": [{"space_id": "a", "title": "A"}], "next_page_token": "p2"}).to_string(),
        ),
        (200, json!({"spaces": [{"space_id": "b"}]}).to_string()),
    ]);
    let spaces = client(&host).list_spaces().expect("list");
    let ids: Vec<_> = spaces.iter().map(|s| s.space_id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    let seen = seen.lock().unwrap();
    assert!(seen[1].request_line.contains("page_token=p2"));
}

#[test]
fn create_space_posts_body_and_requires_id() {
    let (host, seen) = serve(vec![
        (200, json!({"space_id": "new-space"}).to_string()),
        (200, json!({}).to_string()),
    ]);
    let c = client(&host);
    let request = genie_client::CreateSpaceRequest {
        serialized_space: "{}".to_string(),
        warehouse_id: "wh-1".to_string(),
        title: "T".to_string(),
        description: "D".to_string(),
    };
    assert_eq!(c.create_space(&request).unwrap(), SpaceId::from("new-space"));
    let err = c.create_space(&request).unwrap_err();
    assert!(matches!(err, ClientError::MissingField { field: "space_id", .. }));

    let seen = seen.lock().unwrap();
    assert!(seen[0].request_line.starts_with("POST /api/2.0/genie/spaces "));
    let sent: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(sent["warehouse_id"], "wh-1");
}
