//! HTTP fetch adapter against a one-shot local server.

use fxetl_core::error::NetworkError;
use fxetl_core::sources::{bearer_headers, HttpFetcher, JsonFetcher};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Accept one connection, answer with `response` after `delay`, and return
/// the raw request head.
fn serve_once(response: Vec<u8>, delay: Duration) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/latest", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        thread::sleep(delay);
        // The client may already have hung up on a timeout.
        let _ = stream.write_all(&response);
        let _ = stream.flush();
        String::from_utf8_lossy(&request).into_owned()
    });
    (url, handle)
}

fn http_response(status: &str, content_type: &str, body: &str) -> Vec<u8> {
    http_response_bytes(status, content_type, body.as_bytes())
}

fn http_response_bytes(status: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

#[test]
fn ok_json_is_decoded_and_token_sent() {
    let body = r#"{"base":"USD","rates":{"ARS":850.25,"EUR":0.918}}"#;
    let (url, server) = serve_once(
        http_response("200 OK", "application/json", body),
        Duration::ZERO,
    );
    let fetcher = HttpFetcher::new().unwrap();

    let value = fetcher
        .fetch(&url, &bearer_headers(Some("tok-123")), Duration::from_secs(5))
        .unwrap();

    assert_eq!(value["rates"]["ARS"], 850.25);
    let request = server.join().unwrap().to_lowercase();
    assert!(request.starts_with("get /latest"));
    assert!(request.contains("authorization: bearer tok-123"));
}

#[test]
fn server_error_is_http_status() {
    let (url, server) = serve_once(
        http_response("500 Internal Server Error", "text/plain", "boom"),
        Duration::ZERO,
    );
    let fetcher = HttpFetcher::new().unwrap();

    let result = fetcher.fetch(&url, &[], Duration::from_secs(5));

    match result {
        Err(NetworkError::HttpStatus { url: failed, status }) => {
            assert_eq!(status, 500);
            assert_eq!(failed, url);
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn non_json_body_is_decode_error() {
    let (url, server) = serve_once(
        http_response("200 OK", "text/html", "<html>maintenance</html>"),
        Duration::ZERO,
    );
    let fetcher = HttpFetcher::new().unwrap();

    let result = fetcher.fetch(&url, &[], Duration::from_secs(5));

    assert!(matches!(result, Err(NetworkError::Decode { .. })));
    server.join().unwrap();
}

#[test]
fn invalid_utf8_body_is_decode_error() {
    let mut body = br#"{"rates":{"ARS":850.0},"note":""#.to_vec();
    body.push(0xFF);
    body.extend_from_slice(br#""}"#);
    let (url, server) = serve_once(
        http_response_bytes("200 OK", "application/json", &body),
        Duration::ZERO,
    );
    let fetcher = HttpFetcher::new().unwrap();

    let result = fetcher.fetch(&url, &[], Duration::from_secs(5));

    match result {
        Err(e @ NetworkError::Decode { .. }) => assert_eq!(e.url(), url),
        other => panic!("expected Decode, got {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn slow_server_is_timeout() {
    let (url, server) = serve_once(
        http_response("200 OK", "application/json", "{}"),
        Duration::from_millis(1500),
    );
    let fetcher = HttpFetcher::new().unwrap();

    let result = fetcher.fetch(&url, &[], Duration::from_millis(200));

    match result {
        Err(e @ NetworkError::Timeout { .. }) => assert_eq!(e.url(), url),
        other => panic!("expected Timeout, got {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn refused_connection_is_transport_error() {
    let url = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}/latest", listener.local_addr().unwrap())
    };
    let fetcher = HttpFetcher::new().unwrap();

    let result = fetcher.fetch(&url, &[], Duration::from_secs(2));

    assert!(matches!(result, Err(NetworkError::Transport { .. })));
}
