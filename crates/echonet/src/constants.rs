//! Protocol constants.

/// Header byte 1: ECHONET Lite.
pub const EHD1: u8 = 0x10;
/// Header byte 2: message format 1.
pub const EHD2: u8 = 0x81;

/// Fixed transaction id. One request is in flight at a time, so the id never
/// needs to disambiguate anything.
pub const FIXED_TID: u16 = 0x0001;

/// Controller object (this node).
pub const EOJ_CONTROLLER: [u8; 3] = [0x05, 0xFF, 0x01];
/// Low-voltage smart electric energy meter object.
pub const EOJ_SMART_METER: [u8; 3] = [0x02, 0x88, 0x01];

/// Property read request.
pub const ESV_GET: u8 = 0x62;
/// Property read response.
pub const ESV_GET_RES: u8 = 0x72;
/// Property read error response.
pub const ESV_GET_SNA: u8 = 0x52;

/// Shortest well-formed frame: header through OPC, no properties.
pub const MIN_FRAME_LEN: usize = 12;
