//! Edge case tests for zjax-net

use zjax_net::{Http1Parser, MemoryTransport, Method, NetError, Request, Response, Transport};

// ============================================================================
// RESPONSE FRAMING
// ============================================================================

#[test]
fn test_header_without_space() {
    let mut raw: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length:2\r\n\r\nok";
    let resp = smol::block_on(Http1Parser::parse(&mut raw)).unwrap();
    assert_eq!(resp.body, b"ok");
}

#[test]
fn test_missing_reason_phrase() {
    let mut raw: &[u8] = b"HTTP/1.1 204\r\n\r\n";
    let resp = smol::block_on(Http1Parser::parse(&mut raw)).unwrap();
    assert_eq!(resp.status, 204);
    assert_eq!(resp.reason, "");
    assert!(resp.body.is_empty());
}

#[test]
fn test_bad_chunk_size() {
    let mut raw: &[u8] = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n";
    let result = smol::block_on(Http1Parser::parse(&mut raw));
    assert!(matches!(result, Err(NetError::Protocol(_))));
}

#[test]
fn test_truncated_body() {
    let mut raw: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort";
    let result = smol::block_on(Http1Parser::parse(&mut raw));
    assert!(matches!(result, Err(NetError::Io(_))));
}

// ============================================================================
// MEMORY TRANSPORT
// ============================================================================

#[test]
fn test_method_must_match() {
    let transport = MemoryTransport::new();
    transport.html(Method::Post, "/save", "saved");

    let resp = smol::block_on(transport.send(Request::get("http://localhost/save"))).unwrap();
    assert_eq!(resp.status, 404);
}

#[test]
fn test_later_route_wins() {
    let transport = MemoryTransport::new();
    transport
        .html(Method::Get, "/x", "first")
        .route(Method::Get, "/x", Response::new(500, "boom"));

    let resp = smol::block_on(transport.send(Request::get("http://localhost/x"))).unwrap();
    assert_eq!(resp.status, 500);
    assert_eq!(resp.reason, "Internal Server Error");
}

#[test]
fn test_clones_share_routes() {
    let transport = MemoryTransport::new();
    let handle = transport.clone();
    handle.html(Method::Get, "/", "home");

    let resp = smol::block_on(transport.send(Request::get("http://localhost/"))).unwrap();
    assert_eq!(resp.text(), "home");
    assert_eq!(handle.requests()[0].url, "http://localhost/");
}

#[test]
fn test_invalid_url() {
    let transport = MemoryTransport::new();
    let result = smol::block_on(transport.send(Request::get("not a url")));
    assert!(matches!(result, Err(NetError::InvalidUrl(_))));
}
