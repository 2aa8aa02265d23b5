//! Coordinator discovery and PANA join.

use std::collections::HashMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;

use crate::client::SkClient;
use crate::events::{EVENT_PANA_DONE, EVENT_PANA_FAILED, EVENT_SCAN_DONE};
use crate::SkError;

/// Scan durations to try, shortest first. The duration is the modem's
/// per-channel listen time exponent, so each step doubles the scan.
pub const SCAN_DURATION_MIN: u8 = 4;
pub const SCAN_DURATION_MAX: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
    ChannelFound,
    AddressResolving,
    Joining,
    Established,
    Failed,
}

/// Radio parameters needed to reach the meter. Either pre-supplied by the
/// caller or produced by a scan plus address resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Logical channel number, as the hex string the modem reported.
    pub channel: String,
    /// PAN identifier, hex string.
    pub pan_id: String,
    /// Peer IPv6 link-local address.
    pub addr: String,
}

/// One coordinator found by an active scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanDescriptor {
    pub channel: String,
    pub pan_id: String,
    /// Short (MAC) address, input to `SKLL64` resolution.
    pub addr: String,
    pub channel_page: Option<String>,
    pub lqi: Option<String>,
    pub pair_id: Option<String>,
}

impl PanDescriptor {
    /// Lifts the flat `key: value` attribute map off the wire into a
    /// descriptor. `None` when the scan attempt found no coordinator.
    fn from_attrs(attrs: &HashMap<String, String>) -> Option<Self> {
        Some(Self {
            channel: attrs.get("Channel")?.clone(),
            pan_id: attrs.get("Pan ID")?.clone(),
            addr: attrs.get("Addr")?.clone(),
            channel_page: attrs.get("Channel Page").cloned(),
            lqi: attrs.get("LQI").cloned(),
            pair_id: attrs.get("PairID").cloned(),
        })
    }
}

/// Drives the modem from idle to an established PANA session.
pub struct Joiner<'a, W> {
    client: &'a mut SkClient<W>,
    state: SessionState,
}

impl<'a, W: AsyncWrite + Unpin> Joiner<'a, W> {
    pub fn new(client: &'a mut SkClient<W>) -> Self {
        Self {
            client,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Scans for the meter (unless `presupplied` skips that), programs the
    /// channel and PAN registers, and runs the join handshake. On success the
    /// session is established and the parameters in use are returned.
    pub async fn establish(
        &mut self,
        presupplied: Option<NetworkParams>,
    ) -> Result<NetworkParams, SkError> {
        let params = match presupplied {
            Some(params) => params,
            None => self.discover().await?,
        };

        self.client
            .execute(&format!("SKSREG S2 {}", params.channel))
            .await?;
        self.client
            .execute(&format!("SKSREG S3 {}", params.pan_id))
            .await?;

        self.state = SessionState::Joining;
        self.client
            .execute(&format!("SKJOIN {}", params.addr))
            .await?;
        match self.await_pana().await {
            Ok(()) => {
                self.state = SessionState::Established;
                Ok(params)
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    async fn discover(&mut self) -> Result<NetworkParams, SkError> {
        self.state = SessionState::Scanning;
        let desc = match self.scan().await {
            Ok(desc) => desc,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        };
        self.state = SessionState::ChannelFound;
        info!(
            "found coordinator: channel {} pan {} addr {}",
            desc.channel, desc.pan_id, desc.addr
        );

        self.state = SessionState::AddressResolving;
        let addr = self.client.execute(&format!("SKLL64 {}", desc.addr)).await?;
        Ok(NetworkParams {
            channel: desc.channel,
            pan_id: desc.pan_id,
            addr,
        })
    }

    /// Escalates the scan duration until a coordinator answers. The first
    /// attempt that reports a channel wins; exhausting the range is fatal.
    async fn scan(&mut self) -> Result<PanDescriptor, SkError> {
        for duration in SCAN_DURATION_MIN..=SCAN_DURATION_MAX {
            debug!("scanning with duration {}", duration);
            self.client
                .execute(&format!("SKSCAN 2 FFFFFFFF {} 0", duration))
                .await?;
            let attrs = self.read_scan().await?;
            if let Some(desc) = PanDescriptor::from_attrs(&attrs) {
                return Ok(desc);
            }
        }
        Err(SkError::ScanExhausted)
    }

    /// Drains lines until the scan-complete event, collecting the indented
    /// `key: value` attribute lines. A quiet modem ends the attempt with
    /// whatever was collected; the retry budget decides whether that is fatal.
    async fn read_scan(&mut self) -> Result<HashMap<String, String>, SkError> {
        let wait = self.client.config().scan_timeout;
        let mut attrs = HashMap::new();
        loop {
            let line = match self.client.recv_line(wait).await {
                Ok(line) => line,
                Err(SkError::Timeout) => return Ok(attrs),
                Err(e) => return Err(e),
            };
            if line.starts_with(EVENT_SCAN_DONE) {
                return Ok(attrs);
            }
            if let Some(rest) = line.strip_prefix(' ') {
                if let Some((key, value)) = rest.trim_start().split_once(':') {
                    attrs.insert(key.to_string(), value.to_string());
                }
            }
        }
    }

    /// Waits out the join handshake. Progress is visible only through event
    /// lines; everything else (including early `ERXUDP`) is ignored here.
    async fn await_pana(&mut self) -> Result<(), SkError> {
        let wait = self.client.config().join_timeout;
        loop {
            let line = self.client.recv_line(wait).await?;
            if line.starts_with(EVENT_PANA_FAILED) {
                return Err(SkError::JoinFailed);
            }
            if line.starts_with(EVENT_PANA_DONE) {
                return Ok(());
            }
        }
    }
}
