//! Minimal HTTP/1.1 server standing in for a module registry.
//!
//! Answers GET requests from a fixed route table with a status code and an
//! optional `X-Terraform-Get` header, and records the paths it was asked for.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: &'static str,
    pub terraform_get: Option<String>,
}

impl Route {
    pub fn location(url: &str) -> Self {
        Self {
            status: "204 No Content",
            terraform_get: Some(url.to_string()),
        }
    }

    pub fn status(status: &'static str) -> Self {
        Self {
            status,
            terraform_get: None,
        }
    }
}

pub struct RegistryServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl RegistryServer {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(routes: HashMap<String, Route>) -> RegistryServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(routes);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, &routes, &seen));
        }
    });
    RegistryServer {
        base_url: format!("http://127.0.0.1:{}", port),
        requests,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    routes: &HashMap<String, Route>,
    seen: &Mutex<Vec<String>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut first = request.lines().next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("").to_string();
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    seen.lock().unwrap().push(path.clone());

    let response = match routes.get(&path) {
        Some(route) => {
            let header = route
                .terraform_get
                .as_ref()
                .map(|v| format!("X-Terraform-Get: {}\r\n", v))
                .unwrap_or_default();
            format!("HTTP/1.1 {}\r\nContent-Length: 0\r\n{}\r\n", route.status, header)
        }
        None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_string(),
    };
    let _ = stream.write_all(response.as_bytes());
}
