// src/web/rate_limiter.rs
//! In-memory, fixed-window request limiter keyed by client IP.
//!
//! This is an optional policy layer; the auth core behaves the same whether
//! or not it is installed.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Counts one request from `ip`. Returns false once the client has used
    /// up its allowance for the current window.
    pub async fn check_and_increment(&self, ip: IpAddr) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let entry = windows.entry(ip).or_insert(Window { count: 0, started: now });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { count: 1, started: now };
            return true;
        }
        if entry.count < self.max_requests {
            entry.count += 1;
            true
        } else {
            false
        }
    }

    /// Drops windows that ended long enough ago to be irrelevant.
    pub async fn cleanup(&self) {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        windows.retain(|_, w| now.duration_since(w.started) < self.window * 2);
    }

    pub async fn tracked_clients(&self) -> usize {
        self.windows.lock().await.len()
    }
}
