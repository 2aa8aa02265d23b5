//! ECHONET Lite frame codec for the B-route smart meter service.
//!
//! Frames travel as hex strings inside SKSTACK command and event lines. This
//! crate builds Get requests, parses and validates incoming frames, matches a
//! response to the request that caused it, and decodes the property values the
//! meter reports.

mod constants;
mod error;
mod frame;
mod properties;

pub use constants::*;
pub use error::EchonetError;
pub use frame::{EchoFrame, Property};
pub use properties::{decode_reading, MeterReading, EPC_INSTANT_CURRENTS, EPC_INSTANT_POWER};
