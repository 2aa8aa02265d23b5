//! Unsolicited modem lines.

/// Active scan finished (one line per `SKSCAN`).
pub const EVENT_SCAN_DONE: &str = "EVENT 22 ";
/// PANA join handshake failed.
pub const EVENT_PANA_FAILED: &str = "EVENT 24 ";
/// PANA join handshake succeeded.
pub const EVENT_PANA_DONE: &str = "EVENT 25 ";

/// An `ERXUDP` data notification carrying one received datagram.
///
/// The hex payload sits at a fixed whitespace-split position; anything shorter
/// or with undecodable hex is malformed and dropped by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxUdp {
    pub sender: String,
    pub dest: String,
    pub rport: u16,
    pub lport: u16,
    pub payload: Vec<u8>,
}

/// Field position of the hex payload within the line.
const PAYLOAD_FIELD: usize = 9;

impl RxUdp {
    /// Returns `None` for anything that is not a well-formed `ERXUDP` line.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(' ').collect();
        if fields.first() != Some(&"ERXUDP") || fields.len() <= PAYLOAD_FIELD {
            return None;
        }
        Some(Self {
            sender: fields[1].to_string(),
            dest: fields[2].to_string(),
            rport: u16::from_str_radix(fields[3], 16).ok()?,
            lport: u16::from_str_radix(fields[4], 16).ok()?,
            payload: hex::decode(fields[PAYLOAD_FIELD]).ok()?,
        })
    }
}
