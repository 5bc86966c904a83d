use std::time::Duration;

/// Gateway-level configuration for the dispatch loop and its sockets.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upper bound on how long one poll waits for readiness. Also bounds how
    /// long shutdown takes to be noticed.
    pub poll_interval: Duration,
    /// Linger period applied to every bound socket. Zero drops unsent
    /// replies on close instead of blocking teardown.
    pub linger: Duration,
    /// Chain a tracing observer behind every reply sink.
    pub trace_replies: bool,
}

impl GatewayConfig {
    /// Poll timeout in the millisecond form the poll call takes.
    #[must_use]
    pub fn poll_timeout_ms(&self) -> i64 {
        i64::try_from(self.poll_interval.as_millis()).unwrap_or(i64::MAX)
    }

    /// Linger in the millisecond form socket options take.
    #[must_use]
    pub fn linger_ms(&self) -> i32 {
        i32::try_from(self.linger.as_millis()).unwrap_or(i32::MAX)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            linger: Duration::ZERO,
            trace_replies: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = GatewayConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.linger, Duration::ZERO);
        assert!(!config.trace_replies);
    }

    #[test]
    fn millisecond_conversions_saturate() {
        let config = GatewayConfig {
            poll_interval: Duration::from_secs(u64::MAX),
            linger: Duration::from_secs(u64::MAX),
            trace_replies: false,
        };
        assert_eq!(config.poll_timeout_ms(), i64::MAX);
        assert_eq!(config.linger_ms(), i32::MAX);

        let defaults = GatewayConfig::default();
        assert_eq!(defaults.poll_timeout_ms(), 500);
        assert_eq!(defaults.linger_ms(), 0);
    }
}
