use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum requests per identity inside the window
pub const MAX_REQUESTS: usize = 30;
/// Sliding window length in milliseconds
pub const TIME_WINDOW_MS: u64 = 60_000;
/// Minimum gap between full sweeps of the identity map
pub const CLEANUP_INTERVAL_MS: u64 = 10_000;

struct RateState {
    windows: HashMap<String, Vec<u64>>,
    last_sweep: u64,
}

/// Sliding-window request counter, one timestamp list per client identity.
///
/// Exact per identity: every request inside the window is an individual
/// timestamp, purged lazily on each check. The periodic sweep only bounds
/// the size of the identity map; identities left with no live timestamps
/// are dropped there.
pub struct RateLimiter {
    state: Mutex<RateState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RateState {
                windows: HashMap::new(),
                last_sweep: 0,
            }),
        }
    }

    /// Check the current wall-clock window, recording the request if allowed.
    pub fn is_limited(&self, identity: &str) -> bool {
        self.check_and_record(identity, now_ms())
    }

    /// Returns true when the identity is over the limit at `now`.
    /// A limited request is not recorded.
    pub fn check_and_record(&self, identity: &str, now: u64) -> bool {
        let mut state = self.state.lock();
        let window_start = now.saturating_sub(TIME_WINDOW_MS);

        if now.saturating_sub(state.last_sweep) > CLEANUP_INTERVAL_MS {
            state.windows.retain(|_, stamps| {
                stamps.retain(|&t| t > window_start);
                !stamps.is_empty()
            });
            state.last_sweep = now;
        }

        let stamps = state.windows.entry(identity.to_string()).or_default();
        stamps.retain(|&t| t > window_start);
        if stamps.len() >= MAX_REQUESTS {
            return true;
        }
        stamps.push(now);
        false
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
