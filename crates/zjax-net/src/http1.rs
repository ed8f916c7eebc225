//! HTTP/1.1 Framing
//!
//! Encodes a [`Request`] onto the wire and reads a [`Response`] back.
//! One request per connection: every request carries `Connection: close`.

use smol::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use url::Url;

use crate::{NetError, Request, Response};

/// Largest response body accepted, whatever the framing claims
pub const MAX_BODY: usize = 64 * 1024 * 1024;

/// How the response body is delimited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Length(usize),
    Chunked,
    UntilClose,
    Empty,
}

/// Encode `request` for `url`, extra headers first, request headers last
pub(crate) fn encode_request(
    url: &Url,
    request: &Request,
    extra: &[(String, String)],
) -> Result<Vec<u8>, NetError> {
    let host = url
        .host_str()
        .ok_or_else(|| NetError::InvalidUrl(request.url.clone()))?;

    let mut head = String::with_capacity(256);
    head.push_str(request.method.as_str());
    head.push(' ');
    head.push_str(url.path());
    if let Some(query) = url.query() {
        head.push('?');
        head.push_str(query);
    }
    head.push_str(" HTTP/1.1\r\n");

    match url.port() {
        Some(port) => head.push_str(&format!("Host: {}:{}\r\n", host, port)),
        None => head.push_str(&format!("Host: {}\r\n", host)),
    }
    head.push_str("Connection: close\r\n");
    for (name, value) in extra.iter().chain(request.headers.iter()) {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    let body = request.body.as_deref().unwrap_or_default();
    if request.body.is_some() && request.header("content-length").is_none() {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("\r\n");

    let mut wire = head.into_bytes();
    wire.extend_from_slice(body);
    Ok(wire)
}

/// HTTP/1.x response reader
pub struct Http1Parser;

impl Http1Parser {
    /// Read one response from `reader`
    ///
    /// Without `Content-Length` or chunked encoding the body runs to EOF.
    pub async fn parse<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Response, NetError> {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let (status, reason) = status_line(&line)?;

        let mut headers = Vec::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                break;
            }
            let field = line.trim_end();
            if field.is_empty() {
                break;
            }
            if let Some((name, value)) = field.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        let mut response = Response { status, reason, headers, body: Vec::new() };
        match framing(&response)? {
            Framing::Empty => {}
            Framing::Length(len) => {
                read_body(reader, len, &mut response.body).await?;
                if response.body.len() < len {
                    return Err(NetError::Protocol(format!(
                        "body ended after {} of {} bytes",
                        response.body.len(),
                        len
                    )));
                }
            }
            Framing::Chunked => response.body = read_chunks(reader).await?,
            Framing::UntilClose => {
                read_body(reader, MAX_BODY, &mut response.body).await?;
                let mut extra = [0u8; 1];
                if reader.read(&mut extra).await? > 0 {
                    return Err(too_large());
                }
            }
        }

        tracing::debug!("{} {} ({} bytes)", response.status, response.reason, response.body.len());
        Ok(response)
    }
}

fn status_line(line: &str) -> Result<(u16, String), NetError> {
    let line = line.trim_end();
    let invalid = || NetError::Protocol(format!("invalid status line '{}'", line));

    let (version, rest) = line.split_once(' ').ok_or_else(invalid)?;
    if version != "HTTP/1.1" && version != "HTTP/1.0" {
        return Err(invalid());
    }
    let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));
    let status = code.parse().map_err(|_| invalid())?;
    Ok((status, reason.to_string()))
}

fn framing(response: &Response) -> Result<Framing, NetError> {
    if matches!(response.status, 100..=199 | 204 | 304) {
        return Ok(Framing::Empty);
    }
    if response
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        return Ok(Framing::Chunked);
    }
    match response.header("content-length") {
        Some(value) => match value.trim().parse::<usize>() {
            Ok(len) if len > MAX_BODY => Err(too_large()),
            Ok(len) => Ok(Framing::Length(len)),
            Err(_) => Err(NetError::Protocol(format!("invalid content-length '{}'", value))),
        },
        None => Ok(Framing::UntilClose),
    }
}

fn too_large() -> NetError {
    NetError::Protocol(format!("response body exceeds {} bytes", MAX_BODY))
}

/// Append at most `limit` bytes; grows with the data, not with the claim
async fn read_body<R: AsyncBufRead + Unpin>(reader: &mut R, limit: usize, body: &mut Vec<u8>) -> Result<(), NetError> {
    let limit = u64::try_from(limit).unwrap_or(u64::MAX);
    (&mut *reader).take(limit).read_to_end(body).await?;
    Ok(())
}

async fn read_chunks<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, NetError> {
    let mut body = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        reader.read_line(&mut line).await?;
        let digits = line.trim().split(';').next().unwrap_or_default();
        let size = usize::from_str_radix(digits, 16)
            .map_err(|_| NetError::Protocol(format!("invalid chunk size '{}'", digits)))?;

        if size > 0 {
            let total = body.len().checked_add(size).filter(|&t| t <= MAX_BODY).ok_or_else(too_large)?;
            read_body(reader, size, &mut body).await?;
            if body.len() < total {
                return Err(NetError::Protocol("chunk ended early".to_string()));
            }
        }
        // CRLF after the chunk, or the empty trailer after the last one
        line.clear();
        reader.read_line(&mut line).await?;
        if size == 0 {
            return Ok(body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    fn parse(raw: &str) -> Result<Response, NetError> {
        let mut reader = raw.as_bytes();
        smol::block_on(Http1Parser::parse(&mut reader))
    }

    fn encode(request: &Request) -> String {
        let url = Url::parse(&request.url).unwrap();
        String::from_utf8(encode_request(&url, request, &[]).unwrap()).unwrap()
    }

    #[test]
    fn test_encode_get_with_query() {
        let req = Request::get("http://example.com:8080/books?page=2").with_header("Accept", "text/html");
        let wire = encode(&req);
        assert!(wire.starts_with("GET /books?page=2 HTTP/1.1\r\nHost: example.com:8080\r\n"));
        assert!(wire.contains("Accept: text/html\r\n"));
        assert!(!wire.contains("Content-Length"));
        assert!(wire.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_encode_body_sets_length() {
        let req = Request::new(Method::Put, "http://example.com/save").with_body(b"name=zjax".to_vec());
        let wire = encode(&req);
        assert!(wire.starts_with("PUT /save HTTP/1.1\r\n"));
        assert!(wire.contains("Content-Length: 9\r\n"));
        assert!(wire.ends_with("\r\n\r\nname=zjax"));
    }

    #[test]
    fn test_response_parse() {
        let resp = parse("HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 5\r\n\r\nHello").unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.header("content-type"), Some("text/html"));
        assert_eq!(resp.body, b"Hello");
    }

    #[test]
    fn test_response_chunked() {
        let resp = parse("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3;ext=1\r\nabc\r\n2\r\nde\r\n0\r\n\r\n").unwrap();
        assert_eq!(resp.body, b"abcde");
    }

    #[test]
    fn test_response_until_eof() {
        let resp = parse("HTTP/1.0 404 Not Found\r\n\r\n<p>missing</p>").unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.text(), "<p>missing</p>");
    }

    #[test]
    fn test_bad_content_length() {
        assert!(matches!(parse("HTTP/1.1 200 OK\r\nContent-Length: many\r\n\r\n"), Err(NetError::Protocol(_))));
    }

    #[test]
    fn test_oversized_content_length() {
        let resp = parse("HTTP/1.1 200 OK\r\nContent-Length: 18446744073709551615\r\n\r\nabc");
        assert!(matches!(resp, Err(NetError::Protocol(_))));
        let resp = parse("HTTP/1.1 200 OK\r\nContent-Length: 999999999999\r\n\r\nabc");
        assert!(matches!(resp, Err(NetError::Protocol(_))));
    }

    #[test]
    fn test_truncated_body() {
        let resp = parse("HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc");
        assert!(matches!(resp, Err(NetError::Protocol(_))));
    }

    #[test]
    fn test_chunk_size_overflow() {
        let raw = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1\r\na\r\nffffffffffffffff\r\nb\r\n0\r\n\r\n";
        assert!(matches!(parse(raw), Err(NetError::Protocol(_))));
    }

    #[test]
    fn test_invalid_status_line() {
        assert!(matches!(parse("garbage\r\n\r\n"), Err(NetError::Protocol(_))));
        assert!(matches!(parse("HTTP/2 200 OK\r\n\r\n"), Err(NetError::Protocol(_))));
    }
}
