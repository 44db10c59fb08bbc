//! In-process upstream servers for exercising the HTTP components.

use axum::http::HeaderMap;
use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// An axum router served on an ephemeral local port for the life of a test.
pub struct MockUpstream {
    addr: SocketAddr,
}

impl MockUpstream {
    pub async fn start(router: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock upstream");
        let addr = listener.local_addr().expect("Mock upstream has no address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        Self { addr }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

/// One request seen by a mock route.
#[derive(Debug, Clone)]
pub struct Call {
    pub route: String,
    pub uri: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Call {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

/// Shared request log for mock routes.
#[derive(Debug, Clone, Default)]
pub struct Recorded(Arc<Mutex<Vec<Call>>>);

impl Recorded {
    pub fn push(&self, route: &str, headers: &HeaderMap, body: &str) {
        let headers = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        self.0.lock().unwrap().push(Call {
            route: route.to_string(),
            uri: None,
            headers,
            body: body.to_string(),
        });
    }

    pub fn push_uri(&self, route: &str, uri: &axum::http::Uri, headers: &HeaderMap) {
        self.push(route, headers, "");
        if let Some(last) = self.0.lock().unwrap().last_mut() {
            last.uri = Some(uri.to_string());
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, route: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.route == route)
            .count()
    }
}
