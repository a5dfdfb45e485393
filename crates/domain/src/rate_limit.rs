use std::collections::HashMap;
use std::sync::Mutex;

use crate::util::now_secs;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
}

#[derive(Clone, Copy, Debug)]
struct Window {
    start: u64,
    count: u32,
}

/// Per-key counter over aligned fixed windows (`start = now - now % window`).
/// Single process only.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    limit: u32,
    window_secs: u64,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowRateLimiter {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            limit,
            window_secs: window_secs.max(1),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, now_secs())
    }

    pub fn check_at(&self, key: &str, now_secs: u64) -> RateDecision {
        let window_start = now_secs - now_secs % self.window_secs;
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let window = windows.entry(key.to_string()).or_insert(Window {
            start: window_start,
            count: 0,
        });
        if window.start != window_start {
            *window = Window {
                start: window_start,
                count: 0,
            };
        }

        if window.count >= self.limit {
            return RateDecision {
                allowed: false,
                remaining: 0,
            };
        }
        window.count += 1;
        RateDecision {
            allowed: true,
            remaining: self.limit - window.count,
        }
    }
}
