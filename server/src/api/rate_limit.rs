use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::warn;

/// Sliding-window limiter keyed by client address, for the credential
/// endpoints (register, login).
#[derive(Clone)]
pub struct RateLimiter {
    hits: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            hits: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Records a request from `client`; false once the client is over its
    /// budget for the current window.
    pub async fn allow(&self, client: &str) -> bool {
        let mut hits = self.hits.lock().await;
        let now = Instant::now();
        let times = hits.entry(client.to_string()).or_default();

        while times
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            times.pop_front();
        }

        if times.len() < self.max_requests {
            times.push_back(now);
            true
        } else {
            warn!("Rate limit exceeded for client {}", client);
            false
        }
    }

    /// Forgets clients with no requests inside the window.
    pub async fn prune(&self) {
        let mut hits = self.hits.lock().await;
        let now = Instant::now();
        hits.retain(|_, times| {
            times.retain(|t| now.duration_since(*t) < self.window);
            !times.is_empty()
        });
    }

    pub async fn tracked_clients(&self) -> usize {
        self.hits.lock().await.len()
    }
}

/// First address of X-Forwarded-For, else X-Real-IP.
fn client_key(headers: &HeaderMap) -> String {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(ip) = header("x-forwarded-for").and_then(|v| v.split(',').next()) {
        let ip = ip.trim();
        if !ip.is_empty() {
            return ip.to_string();
        }
    }
    if let Some(ip) = header("x-real-ip") {
        return ip.trim().to_string();
    }
    "unknown".to_string()
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(request.headers());

    if !limiter.allow(&client).await {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "Too many requests. Please try again later."
            })),
        )
            .into_response();
    }

    next.run(request).await
}

/// Builds a limiter and starts its background pruning.
pub fn rate_limit_layer(max_requests: usize, window_seconds: u64) -> RateLimiter {
    let limiter = RateLimiter::new(max_requests, Duration::from_secs(window_seconds));

    let pruner = limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            pruner.prune().await;
        }
    });

    limiter
}
