//! SKSTACK line-protocol client for Wi-SUN B-route modems.
//!
//! The modem speaks an AT-style protocol over a CRLF-terminated byte stream:
//! one command line goes out, reply lines come back until a terminal `OK` or
//! `FAIL <reason>`, and unsolicited lines (`EVENT <code> ...`, `ERXUDP ...`)
//! can arrive at any time. A dedicated reader task owns the receive half so
//! that unsolicited lines are never lost while a command is in flight.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod client;
pub mod events;
pub mod line;
pub mod session;

pub use client::SkClient;
pub use events::RxUdp;
pub use session::{Joiner, NetworkParams, PanDescriptor, SessionState};

#[derive(Debug, Error)]
pub enum SkError {
    #[error("modem io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("modem stream closed")]
    Disconnected,

    #[error("timed out waiting for modem response")]
    Timeout,

    #[error("command rejected: {0}")]
    CommandFailed(String),

    #[error("no coordinator found in any scan duration")]
    ScanExhausted,

    #[error("PANA join handshake failed")]
    JoinFailed,
}

/// Timeouts for the protocol's distinct waiting regimes.
///
/// Each is an idle timeout: it restarts whenever a line arrives, not when the
/// wait began.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkConfig {
    /// Wait for the next reply line of an ordinary command.
    pub command_timeout: Duration,
    /// Wait for the next line of an active channel scan. Scans are slow.
    pub scan_timeout: Duration,
    /// Wait for the next line of the PANA join handshake.
    pub join_timeout: Duration,
    /// Wait for a correlated meter reply after a successful UDP send.
    pub response_timeout: Duration,
}

impl Default for SkConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(60),
            scan_timeout: Duration::from_secs(120),
            join_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let c = SkConfig::default();
        assert_eq!(c.command_timeout, Duration::from_secs(60));
        assert_eq!(c.scan_timeout, Duration::from_secs(120));
        assert_eq!(c.join_timeout, Duration::from_secs(10));
        assert_eq!(c.response_timeout, Duration::from_secs(2));
    }
}
