//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed table of paths, each with its own status and body, and
//! counts every request it receives. Unknown paths get 404.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    /// Sent as `Location` (for redirects).
    pub location: Option<String>,
    /// Advertise this many extra bytes in `Content-Length`, then close early.
    pub truncate_by: usize,
    /// Hold the connection open this long after sending the body.
    pub stall: Option<Duration>,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            location: None,
            truncate_by: 0,
            stall: None,
        }
    }

    pub fn redirect(to: &str) -> Self {
        Self {
            location: Some(to.to_string()),
            ..Self::status(302, b"moved".to_vec())
        }
    }

    pub fn truncated(body: impl Into<Vec<u8>>, missing: usize) -> Self {
        Self {
            truncate_by: missing,
            ..Self::ok(body)
        }
    }

    /// Sends headers and `prefix`, then goes silent for `stall` with the rest still owed.
    pub fn stalled(prefix: impl Into<Vec<u8>>, stall: Duration) -> Self {
        Self {
            stall: Some(stall),
            ..Self::truncated(prefix, 1024)
        }
    }
}

pub struct ImageServer {
    base: String,
    hits: Arc<AtomicUsize>,
}

impl ImageServer {
    /// Starts serving `routes` on a background thread until the process exits.
    pub fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_srv = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                hits_srv.fetch_add(1, Ordering::SeqCst);
                thread::spawn(move || handle(stream, &routes));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            hits,
        }
    }

    /// Absolute URL for `path` (which starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Connections accepted so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        302 => "Found",
        304 => "Not Modified",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return None,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8(data).ok()
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let path = request
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let route = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| Route::status(404, b"not found".to_vec()));

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        route.status,
        reason(route.status),
        route.body.len() + route.truncate_by
    );
    if let Some(location) = &route.location {
        head.push_str(&format!("Location: {}\r\n", location));
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&route.body);
    let _ = stream.flush();
    if let Some(stall) = route.stall {
        thread::sleep(stall);
    }
}
