//! Integration tests for the `laurel serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port, makes
//! raw HTTP/1.1 requests over `TcpStream`, and verifies status codes and
//! JSON bodies.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so parallel `cargo test --workspace`
/// runs (separate test binaries) don't collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 21000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

struct ServerGuard {
    child: Child,
    port: u16,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Start `laurel serve` on a fresh port and wait until it accepts.
fn start_server() -> ServerGuard {
    let port = next_port();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_laurel"));
    cmd.arg("serve").arg("--port").arg(port.to_string());
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd.spawn().expect("failed to start laurel serve");
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            return ServerGuard { child, port };
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    ServerGuard { child, port }
}

/// Make a raw HTTP request and return (status, body).
fn http_request(
    port: u16,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> (u16, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let mut header_lines = String::new();
    for (name, value) in headers {
        header_lines.push_str(&format!("{}: {}\r\n", name, value));
    }
    let body = body.unwrap_or("");
    if !body.is_empty() || method == "POST" {
        header_lines.push_str("Content-Type: application/json\r\n");
        header_lines.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }

    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost:{}\r\n{}Connection: close\r\n\r\n{}",
        method, path, port, header_lines, body
    );
    stream.write_all(request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);
    parse_http_response(&response)
}

/// Parse an HTTP response into (status_code, body), handling chunked
/// transfer encoding.
fn parse_http_response(response: &str) -> (u16, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"").to_string();
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status = headers
        .lines()
        .next()
        .unwrap_or("")
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    let body = if headers
        .to_lowercase()
        .contains("transfer-encoding: chunked")
    {
        decode_chunked(&body)
    } else {
        body
    };
    (status, body)
}

fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;
    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let chunk_start = line_end + 2;
        let chunk_end = chunk_start + size;
        if chunk_end > remaining.len() {
            break;
        }
        result.push_str(&remaining[chunk_start..chunk_end]);
        remaining = &remaining[chunk_end..];
        remaining = remaining.strip_prefix("\r\n").unwrap_or(remaining);
    }
    result
}

fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("invalid JSON ({}): {}", e, body))
}

const OWNER: [(&str, &str); 1] = [("x-actor-id", "student-1")];
const REVIEWER: [(&str, &str); 2] = [("x-actor-id", "teacher-1"), ("x-capabilities", "reviewer")];
const ADMIN: [(&str, &str); 2] = [("x-actor-id", "admin-1"), ("x-capabilities", "admin")];

/// Create a draft and return (id, version).
fn create_draft(port: u16, title: &str) -> (String, i64) {
    let body = format!(
        r#"{{"title": "{}", "category": "science", "content_refs": ["media://a"]}}"#,
        title
    );
    let (status, body) = http_request(port, "POST", "/achievements", &OWNER, Some(&body));
    assert_eq!(status, 201, "create failed: {}", body);
    let record = &json(&body)["record"];
    (
        record["id"].as_str().unwrap().to_string(),
        record["version"].as_i64().unwrap(),
    )
}

fn submit(port: u16, id: &str, version: i64) -> i64 {
    let (status, body) = http_request(
        port,
        "POST",
        &format!("/achievements/{}/submit", id),
        &OWNER,
        Some(&format!(r#"{{"version": {}}}"#, version)),
    );
    assert_eq!(status, 200, "submit failed: {}", body);
    json(&body)["record"]["version"].as_i64().unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────────

#[test]
fn health_requires_no_session() {
    let server = start_server();
    let (status, body) = http_request(server.port, "GET", "/health", &[], None);
    assert_eq!(status, 200);
    assert_eq!(json(&body)["status"], "ok");
}

#[test]
fn missing_actor_header_is_unauthorized() {
    let server = start_server();
    let (status, body) = http_request(server.port, "GET", "/achievements", &[], None);
    assert_eq!(status, 401);
    assert_eq!(json(&body)["error"]["code"], "unauthenticated");
}

#[test]
fn full_review_lifecycle_over_http() {
    let server = start_server();
    let (id, version) = create_draft(server.port, "Hydroponic garden");
    assert_eq!(version, 0);

    let version = submit(server.port, &id, version);
    assert_eq!(version, 1);

    let (status, body) = http_request(
        server.port,
        "POST",
        &format!("/achievements/{}/approve", id),
        &REVIEWER,
        Some(&format!(r#"{{"version": {}, "score": 85}}"#, version)),
    );
    assert_eq!(status, 200, "approve failed: {}", body);
    let record = &json(&body)["record"];
    assert_eq!(record["status"], "approved");
    assert_eq!(record["score"], 85);
    assert_eq!(record["rejection_reason"], serde_json::Value::Null);
    assert_eq!(record["reviewer_id"], "teacher-1");
    assert_eq!(record["version"], 2);

    let (status, body) = http_request(
        server.port,
        "GET",
        &format!("/achievements/{}/events", id),
        &OWNER,
        None,
    );
    assert_eq!(status, 200);
    let events = json(&body)["events"].as_array().unwrap().clone();
    let actions: Vec<&str> = events.iter().map(|e| e["action"].as_str().unwrap()).collect();
    assert_eq!(actions, ["submit", "approve"]);
}

#[test]
fn stale_version_maps_to_conflict() {
    let server = start_server();
    let (id, version) = create_draft(server.port, "Catapult");
    submit(server.port, &id, version);

    // Reuse the consumed version 0.
    let (status, body) = http_request(
        server.port,
        "POST",
        &format!("/achievements/{}/approve", id),
        &REVIEWER,
        Some(r#"{"version": 0, "score": 50}"#),
    );
    assert_eq!(status, 409);
    assert_eq!(json(&body)["error"]["code"], "concurrent_modification");
}

#[test]
fn blank_reject_reason_is_bad_request() {
    let server = start_server();
    let (id, version) = create_draft(server.port, "Catapult");
    submit(server.port, &id, version);

    let (status, body) = http_request(
        server.port,
        "POST",
        &format!("/achievements/{}/reject", id),
        &REVIEWER,
        Some(r#"{"version": 1, "reason": "   "}"#),
    );
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "invalid_input");
}

#[test]
fn approve_from_draft_is_conflict() {
    let server = start_server();
    let (id, _) = create_draft(server.port, "Catapult");
    let (status, body) = http_request(
        server.port,
        "POST",
        &format!("/achievements/{}/approve", id),
        &REVIEWER,
        Some(r#"{"version": 0, "score": 50}"#),
    );
    assert_eq!(status, 409);
    assert_eq!(json(&body)["error"]["code"], "invalid_transition");
}

#[test]
fn stranger_sees_not_found_admin_sees_forbidden() {
    let server = start_server();
    let (id, version) = create_draft(server.port, "Catapult");
    submit(server.port, &id, version);

    // A different student cannot even see the record.
    let (status, body) = http_request(
        server.port,
        "GET",
        &format!("/achievements/{}", id),
        &[("x-actor-id", "student-2")],
        None,
    );
    assert_eq!(status, 404);
    assert_eq!(json(&body)["error"]["code"], "not_found");

    // Admin sees it but cannot decide on it.
    let (status, body) = http_request(
        server.port,
        "POST",
        &format!("/achievements/{}/approve", id),
        &ADMIN,
        Some(r#"{"version": 1, "score": 90}"#),
    );
    assert_eq!(status, 403);
    assert_eq!(json(&body)["error"]["code"], "forbidden");
}

#[test]
fn listing_is_scoped_filtered_and_paginated() {
    let server = start_server();
    for i in 0..3 {
        let (id, version) = create_draft(server.port, &format!("Project {}", i));
        submit(server.port, &id, version);
    }
    create_draft(server.port, "Still drafting");

    // Another student's record is invisible to the owner scope below.
    let other = [("x-actor-id", "student-2")];
    let (status, _) = http_request(
        server.port,
        "POST",
        "/achievements",
        &other,
        Some(r#"{"title": "Theirs", "category": "art"}"#),
    );
    assert_eq!(status, 201);

    let (status, body) = http_request(server.port, "GET", "/achievements", &OWNER, None);
    assert_eq!(status, 200);
    assert_eq!(json(&body)["total"], 4);

    let (status, body) = http_request(
        server.port,
        "GET",
        "/achievements?status=pending&page=1&page_size=2",
        &OWNER,
        None,
    );
    assert_eq!(status, 200);
    let page = json(&body);
    assert_eq!(page["total"], 3);
    assert_eq!(page["records"].as_array().unwrap().len(), 2);
    assert_eq!(page["page"], 1);

    // Reviewer sees all five records.
    let (status, body) = http_request(server.port, "GET", "/achievements", &REVIEWER, None);
    assert_eq!(status, 200);
    assert_eq!(json(&body)["total"], 5);

    // Unknown status token is rejected, not ignored.
    let (status, body) = http_request(
        server.port,
        "GET",
        "/achievements?status=2",
        &OWNER,
        None,
    );
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "invalid_input");
}

#[test]
fn delete_tombstones_draft_and_hides_it() {
    let server = start_server();
    let (id, _) = create_draft(server.port, "Abandoned");

    let (status, _) = http_request(
        server.port,
        "DELETE",
        &format!("/achievements/{}", id),
        &OWNER,
        None,
    );
    assert_eq!(status, 204);

    for actor in [OWNER.as_slice(), REVIEWER.as_slice(), ADMIN.as_slice()] {
        let (status, _) = http_request(
            server.port,
            "GET",
            &format!("/achievements/{}", id),
            actor,
            None,
        );
        assert_eq!(status, 404);
    }
}

#[test]
fn delete_of_pending_record_is_conflict() {
    let server = start_server();
    let (id, version) = create_draft(server.port, "Catapult");
    submit(server.port, &id, version);

    let (status, body) = http_request(
        server.port,
        "DELETE",
        &format!("/achievements/{}", id),
        &OWNER,
        None,
    );
    assert_eq!(status, 409);
    assert_eq!(json(&body)["error"]["code"], "invalid_transition");
}

#[test]
fn reject_resubmit_round_trip() {
    let server = start_server();
    let (id, version) = create_draft(server.port, "Weather balloon");
    submit(server.port, &id, version);

    let (status, body) = http_request(
        server.port,
        "POST",
        &format!("/achievements/{}/reject", id),
        &REVIEWER,
        Some(r#"{"version": 1, "reason": "needs a flight log"}"#),
    );
    assert_eq!(status, 200, "reject failed: {}", body);
    assert_eq!(json(&body)["record"]["status"], "rejected");

    let (status, body) = http_request(
        server.port,
        "POST",
        &format!("/achievements/{}/resubmit", id),
        &OWNER,
        Some(r#"{"version": 2}"#),
    );
    assert_eq!(status, 200, "resubmit failed: {}", body);
    let record = &json(&body)["record"];
    assert_eq!(record["status"], "pending");
    assert_eq!(record["rejection_reason"], serde_json::Value::Null);
    assert_eq!(record["resubmissions"], 1);
}

#[test]
fn withdraw_then_submit_over_http_clears_decision_fields() {
    let server = start_server();
    let (id, version) = create_draft(server.port, "Wind tunnel");
    submit(server.port, &id, version);

    let (status, body) = http_request(
        server.port,
        "POST",
        &format!("/achievements/{}/withdraw", id),
        &OWNER,
        Some(r#"{"version": 1}"#),
    );
    assert_eq!(status, 200, "withdraw failed: {}", body);
    assert_eq!(json(&body)["record"]["status"], "draft");

    let version = submit(server.port, &id, 2);
    assert_eq!(version, 3);
    let (status, body) = http_request(
        server.port,
        "GET",
        &format!("/achievements/{}/events", id),
        &OWNER,
        None,
    );
    assert_eq!(status, 200);
    let events = json(&body)["events"].as_array().unwrap().clone();
    let actions: Vec<&str> = events.iter().map(|e| e["action"].as_str().unwrap()).collect();
    assert_eq!(actions, ["submit", "withdraw", "submit"]);
}

#[test]
fn malformed_body_uses_strict_error_schema() {
    let server = start_server();
    let (id, _) = create_draft(server.port, "Kite");

    // Not JSON at all.
    let (status, body) = http_request(
        server.port,
        "POST",
        &format!("/achievements/{}/submit", id),
        &OWNER,
        Some("{not json"),
    );
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "invalid_input");

    // Valid JSON of the wrong shape.
    let (status, body) = http_request(
        server.port,
        "POST",
        &format!("/achievements/{}/submit", id),
        &OWNER,
        Some(r#"{"version": "zero"}"#),
    );
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "invalid_input");

    // Unknown fields are rejected, not ignored.
    let (status, body) = http_request(
        server.port,
        "POST",
        "/achievements",
        &OWNER,
        Some(r#"{"title": "x", "category": "y", "bogus": 1}"#),
    );
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "invalid_input");
}

#[test]
fn unknown_route_is_json_not_found() {
    let server = start_server();
    let (status, body) = http_request(server.port, "GET", "/nope", &OWNER, None);
    assert_eq!(status, 404);
    assert_eq!(json(&body)["error"]["code"], "not_found");
}
