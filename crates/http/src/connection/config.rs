//! Connection-level tuning knobs.

use http::HeaderValue;

/// Design parameters of one connection.
///
/// The defaults match common practice: 64 KiB / 16 KiB read watermarks and
/// a 64 KiB per-cycle outbound buffer.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub(crate) high_water: usize,
    pub(crate) low_water: usize,
    pub(crate) outbound_buffer_limit: usize,
    pub(crate) server_header: Option<HeaderValue>,
}

impl ConnectionConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self {
            high_water: 64 * 1024,
            low_water: 16 * 1024,
            outbound_buffer_limit: 64 * 1024,
            server_header: Some(HeaderValue::from_static("aqueduct")),
        }
    }

    /// Buffered inbound body bytes at which transport reads pause.
    pub fn high_water(mut self, value: usize) -> Self {
        self.high_water = value;
        self
    }

    /// Buffered inbound body bytes at which paused reads resume.
    pub fn low_water(mut self, value: usize) -> Self {
        self.low_water = value;
        self
    }

    /// Buffered outbound bytes per non-head cycle before its sender suspends.
    pub fn outbound_buffer_limit(mut self, value: usize) -> Self {
        self.outbound_buffer_limit = value;
        self
    }

    /// The `server` header injected into responses that lack one; `None`
    /// disables injection.
    pub fn server_header(mut self, value: Option<HeaderValue>) -> Self {
        self.server_header = value;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}
