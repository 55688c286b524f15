use std::time::Duration;

use crate::network::target::ProtocolFamily;

pub const DEFAULT_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct Config {
    /// Seconds to wait for replies once every probe is out.
    ///
    /// Zero skips the wait entirely.
    pub timeout: u64,
    pub family: ProtocolFamily,
    /// Resolve host names for discovered addresses after capture ends.
    pub reverse_lookup: bool,
    /// Capture poll interval. Bounds how long shutting the capture down takes.
    pub read_timeout: Duration,
    /// Output verbosity, only read by the terminal frontend.
    pub quiet: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            family: ProtocolFamily::V4,
            reverse_lookup: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
            quiet: 0,
        }
    }
}

impl Config {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Budget shared by all reverse lookups of a run.
    pub fn lookup_budget(&self) -> Duration {
        match self.timeout {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }
}
