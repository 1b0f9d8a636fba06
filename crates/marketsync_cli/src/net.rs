//! Minimal HTTP/1.1 client for the marketplace API.
//!
//! Speaks plain `http://` with `Connection: close` framing over a
//! `TcpStream`, with connect, read, and write timeouts. Everything above
//! the socket goes through the `HttpClient` seam, so a TLS-capable client
//! can be swapped in without touching the engine.

use marketsync_api::{HttpClient, HttpError};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// A blocking HTTP client over plain TCP.
pub struct TcpHttpClient {
    timeout: Duration,
}

impl TcpHttpClient {
    /// Creates a client with the given per-call timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl HttpClient for TcpHttpClient {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpError> {
        let target = parse_url(url)?;

        let addr = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|e| HttpError::retryable(format!("resolve {}: {e}", target.host)))?
            .next()
            .ok_or_else(|| {
                HttpError::retryable(format!("no address for {}", target.host))
            })?;

        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|e| HttpError::retryable(format!("connect {addr}: {e}")))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| HttpError::retryable(e.to_string()))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| HttpError::retryable(e.to_string()))?;

        let request = format!(
            "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n",
            target.path,
            target.host,
            body.len()
        );
        stream
            .write_all(request.as_bytes())
            .and_then(|()| stream.write_all(&body))
            .map_err(|e| HttpError::retryable(format!("send request: {e}")))?;

        let mut response = Vec::new();
        stream
            .read_to_end(&mut response)
            .map_err(|e| HttpError::retryable(format!("read response: {e}")))?;

        parse_response(&response)
    }
}

#[derive(Debug)]
struct Target {
    host: String,
    port: u16,
    path: String,
}

fn parse_url(url: &str) -> Result<Target, HttpError> {
    let rest = url.strip_prefix("http://").ok_or_else(|| {
        HttpError::fatal(format!(
            "unsupported endpoint scheme in {url}; this client speaks plain http only"
        ))
    })?;

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| HttpError::fatal(format!("bad port in {url}")))?;
            (host, port)
        }
        None => (authority, 80),
    };

    if host.is_empty() {
        return Err(HttpError::fatal(format!("missing host in {url}")));
    }

    Ok(Target {
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}

fn parse_response(raw: &[u8]) -> Result<Vec<u8>, HttpError> {
    let header_end = find_header_end(raw)
        .ok_or_else(|| HttpError::retryable("truncated HTTP response"))?;
    let head = std::str::from_utf8(&raw[..header_end])
        .map_err(|_| HttpError::fatal("response headers are not UTF-8"))?;

    let status_line = head.lines().next().unwrap_or_default();
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| HttpError::fatal(format!("bad status line: {status_line}")))?;

    let chunked = head.lines().any(|line| {
        let lower = line.to_ascii_lowercase();
        lower.starts_with("transfer-encoding:") && lower.contains("chunked")
    });
    if chunked {
        return Err(HttpError::fatal("chunked responses are not supported"));
    }

    let body = raw[header_end + 4..].to_vec();

    match status {
        200..=299 => Ok(body),
        408 | 429 => Err(HttpError::retryable(format!("HTTP {status}"))),
        500..=599 => Err(HttpError::retryable(format!("HTTP {status}"))),
        _ => Err(HttpError::fatal(format!("HTTP {status}"))),
    }
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                // Drain the request headers before answering.
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/api/test")
    }

    fn client() -> TcpHttpClient {
        TcpHttpClient::new(Duration::from_secs(5))
    }

    #[test]
    fn parses_host_port_and_path() {
        let target = parse_url("http://marketplace.example:8080/api/v1").unwrap();
        assert_eq!(target.host, "marketplace.example");
        assert_eq!(target.port, 8080);
        assert_eq!(target.path, "/api/v1");

        let target = parse_url("http://marketplace.example").unwrap();
        assert_eq!(target.port, 80);
        assert_eq!(target.path, "/");
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = parse_url("https://marketplace.example").unwrap_err();
        assert!(!err.retryable);
    }

    #[test]
    fn successful_exchange_returns_the_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 16\r\n\r\n{\"success\":true}",
        );
        let body = client().post(&url, b"{}".to_vec()).unwrap();
        assert!(body.starts_with(b"{\"success\":true"));
    }

    #[test]
    fn server_errors_are_retryable() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable\r\n\r\n");
        let err = client().post(&url, Vec::new()).unwrap_err();
        assert!(err.retryable);
    }

    #[test]
    fn client_errors_are_fatal() {
        let url = serve_once("HTTP/1.1 404 Not Found\r\n\r\n");
        let err = client().post(&url, Vec::new()).unwrap_err();
        assert!(!err.retryable);
    }

    #[test]
    fn connection_refused_is_retryable() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = client()
            .post(&format!("http://127.0.0.1:{port}/x"), Vec::new())
            .unwrap_err();
        assert!(err.retryable);
    }
}
