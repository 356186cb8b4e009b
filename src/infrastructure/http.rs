//! Minimal blocking HTTP/1.1 handling over any Read + Write stream.
//!
//! Only what the OAuth callback needs:
//! - One request per connection (no keep-alive)
//! - Request bodies are not read
//! - Header cap: 16 KiB

use std::io::{Read, Write};

/// Maximum header section size (16 KiB)
const MAX_HEADER_SIZE: usize = 16 * 1024;

/// Parsed HTTP request line and headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Request target including the query string
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Target without the query string.
    pub fn path(&self) -> &str {
        self.target.split(['?', '#']).next().unwrap_or("/")
    }

    /// Raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, q)| q)
    }
}

/// HTTP response to write back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn html(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![(
                "Content-Type".to_string(),
                "text/html; charset=utf-8".to_string(),
            )],
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

/// Reason phrase for common status codes
fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Read and parse one HTTP request head from a stream.
///
/// Returns None if the connection closed before any byte was received.
/// Returns Some(Err) for malformed requests (caller should write an error response).
pub fn read_request(stream: &mut impl Read) -> Option<Result<HttpRequest, String>> {
    let mut header_buf = Vec::with_capacity(1024);
    let mut byte = [0u8; 1];

    loop {
        match stream.read(&mut byte) {
            Ok(0) => {
                if header_buf.is_empty() {
                    return None;
                }
                return Some(Err("connection closed mid-request".to_string()));
            }
            Ok(_) => {
                header_buf.push(byte[0]);
                if header_buf.len() > MAX_HEADER_SIZE {
                    return Some(Err("headers too large".to_string()));
                }
                if header_buf.ends_with(b"\r\n\r\n") {
                    break;
                }
            }
            Err(e) => {
                if header_buf.is_empty() {
                    return None;
                }
                return Some(Err(format!("read error: {}", e)));
            }
        }
    }

    let mut parsed_headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut parsed_headers);

    match req.parse(&header_buf) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => {
            return Some(Err("incomplete HTTP request".to_string()));
        }
        Err(e) => {
            return Some(Err(format!("HTTP parse error: {}", e)));
        }
    }

    let headers = req
        .headers
        .iter()
        .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).to_string()))
        .collect();

    Some(Ok(HttpRequest {
        method: req.method.unwrap_or("").to_string(),
        target: req.path.unwrap_or("/").to_string(),
        headers,
    }))
}

/// Write an HTTP response to a stream. Errors are ignored (client may have gone away).
pub fn write_response(stream: &mut impl Write, response: &HttpResponse) {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason(response.status),
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes());
    if !response.body.is_empty() {
        let _ = stream.write_all(&response.body);
    }
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_get_request_with_query() {
        let raw = b"GET /oauth-callback?state=abc HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let mut stream = Cursor::new(raw.to_vec());
        let req = read_request(&mut stream).unwrap().unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path(), "/oauth-callback");
        assert_eq!(req.query(), Some("state=abc"));
        assert_eq!(req.headers[0], ("Host".to_string(), "localhost".to_string()));
    }

    #[test]
    fn test_empty_stream_is_clean_close() {
        let mut stream = Cursor::new(Vec::new());
        assert!(read_request(&mut stream).is_none());
    }

    #[test]
    fn test_truncated_request_is_error() {
        let mut stream = Cursor::new(b"GET / HTTP/1.1\r\nHost".to_vec());
        assert!(read_request(&mut stream).unwrap().is_err());
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let mut stream = Cursor::new(b"\x01\x02 nonsense\r\n\r\n".to_vec());
        assert!(read_request(&mut stream).unwrap().is_err());
    }

    #[test]
    fn test_write_response_has_length_and_body() {
        let mut out = Vec::new();
        write_response(&mut out, &HttpResponse::html(200, "<p>ok</p>"));
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 9\r\n"));
        assert!(text.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(text.ends_with("\r\n\r\n<p>ok</p>"));
    }

    #[test]
    fn test_write_empty_response() {
        let mut out = Vec::new();
        write_response(&mut out, &HttpResponse::empty(404));
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Length: 0\r\n"));
    }
}
