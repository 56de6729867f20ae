//! Client configuration

use std::time::Duration;

/// Configuration for the ordering client: backend URL, realtime channel
/// address, and the timing knobs for polling and reconnection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL (e.g., "http://localhost:8000/api")
    pub base_url: String,

    /// Realtime channel TCP address (e.g., "localhost:8001")
    pub channel_addr: String,

    /// HTTP request timeout
    pub request_timeout: Duration,

    /// Status poll interval
    pub poll_interval: Duration,

    /// First reconnect delay; doubles on each consecutive failure
    pub reconnect_delay: Duration,

    /// Reconnect delay ceiling (exponential backoff cap)
    pub max_reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, channel_addr: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            channel_addr: channel_addr.into(),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
            reconnect_delay: Duration::from_millis(1000),
            max_reconnect_delay: Duration::from_secs(10),
        }
    }

    /// Set the HTTP request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the status poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the reconnect backoff range
    pub fn with_reconnect_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_delay = initial;
        self.max_reconnect_delay = max;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000/api", "localhost:8001")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.reconnect_delay, Duration::from_millis(1000));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("http://edge:8000", "edge:8001")
            .with_poll_interval(Duration::from_secs(2))
            .with_reconnect_delays(Duration::from_millis(250), Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
    }
}
