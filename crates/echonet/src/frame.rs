//! Frame building, parsing and request/response correlation.

use bytes::BufMut;

use crate::constants::*;
use crate::error::EchonetError;

/// One (property code, property data) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub epc: u8,
    pub edt: Vec<u8>,
}

/// One application frame.
///
/// Layout: `EHD1 EHD2 TID(2) SEOJ(3) DEOJ(3) ESV OPC` followed by `OPC`
/// repetitions of `EPC PDC EDT[PDC]`. All multi-byte fields are big-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoFrame {
    pub tid: u16,
    pub seoj: [u8; 3],
    pub deoj: [u8; 3],
    pub esv: u8,
    pub properties: Vec<Property>,
}

impl EchoFrame {
    /// Builds a Get request from the controller to the smart meter for the
    /// given property codes.
    pub fn get_request(epcs: &[u8]) -> Self {
        Self {
            tid: FIXED_TID,
            seoj: EOJ_CONTROLLER,
            deoj: EOJ_SMART_METER,
            esv: ESV_GET,
            properties: epcs
                .iter()
                .map(|&epc| Property {
                    epc,
                    edt: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let edt_len: usize = self.properties.iter().map(|p| p.edt.len()).sum();
        let mut buf = Vec::with_capacity(MIN_FRAME_LEN + 2 * self.properties.len() + edt_len);
        buf.put_u8(EHD1);
        buf.put_u8(EHD2);
        buf.put_u16(self.tid);
        buf.put_slice(&self.seoj);
        buf.put_slice(&self.deoj);
        buf.put_u8(self.esv);
        buf.put_u8(self.properties.len() as u8);
        for p in &self.properties {
            buf.put_u8(p.epc);
            buf.put_u8(p.edt.len() as u8);
            buf.put_slice(&p.edt);
        }
        buf
    }

    /// Uppercase-hex rendering for embedding in an `SKSENDTO` command.
    pub fn encode_hex(&self) -> String {
        hex::encode_upper(self.encode())
    }

    pub fn parse(data: &[u8]) -> Result<Self, EchonetError> {
        if data.len() < MIN_FRAME_LEN {
            return Err(EchonetError::FrameTooShort {
                expected: MIN_FRAME_LEN,
                actual: data.len(),
            });
        }
        if data[0] != EHD1 || data[1] != EHD2 {
            return Err(EchonetError::BadHeader(data[0], data[1]));
        }
        let opc = data[11] as usize;
        let mut properties = Vec::with_capacity(opc);
        let mut off = MIN_FRAME_LEN;
        for index in 0..opc {
            if data.len() < off + 2 {
                return Err(EchonetError::TruncatedProperty {
                    index,
                    expected: 2,
                    actual: data.len() - off,
                });
            }
            let epc = data[off];
            let pdc = data[off + 1] as usize;
            off += 2;
            if data.len() < off + pdc {
                return Err(EchonetError::TruncatedProperty {
                    index,
                    expected: pdc,
                    actual: data.len() - off,
                });
            }
            properties.push(Property {
                epc,
                edt: data[off..off + pdc].to_vec(),
            });
            off += pdc;
        }
        Ok(Self {
            tid: u16::from_be_bytes([data[2], data[3]]),
            seoj: [data[4], data[5], data[6]],
            deoj: [data[7], data[8], data[9]],
            esv: data[10],
            properties,
        })
    }

    /// Whether `response` answers this request: its source object is the
    /// request's destination and the property-code sets intersect.
    ///
    /// With the constant TID this is the only correlation available, and it
    /// cannot disambiguate overlapping requests; one request in flight at a
    /// time is a hard constraint of this client.
    pub fn corresponds_to(&self, response: &EchoFrame) -> bool {
        response.seoj == self.deoj
            && response
                .properties
                .iter()
                .any(|r| self.properties.iter().any(|q| q.epc == r.epc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{EPC_INSTANT_CURRENTS, EPC_INSTANT_POWER};

    fn power_response() -> EchoFrame {
        EchoFrame {
            tid: FIXED_TID,
            seoj: EOJ_SMART_METER,
            deoj: EOJ_CONTROLLER,
            esv: ESV_GET_RES,
            properties: vec![Property {
                epc: EPC_INSTANT_POWER,
                edt: vec![0x00, 0x00, 0x03, 0xE8],
            }],
        }
    }

    #[test]
    fn get_request_layout() {
        let frame = EchoFrame::get_request(&[EPC_INSTANT_POWER]);
        assert_eq!(
            frame.encode(),
            vec![
                0x10, 0x81, 0x00, 0x01, 0x05, 0xFF, 0x01, 0x02, 0x88, 0x01, 0x62, 0x01, 0xE7,
                0x00
            ]
        );
        assert_eq!(frame.encode_hex(), "1081000105FF010288016201E700");
    }

    #[test]
    fn parse_round_trips_encode() {
        let frame = power_response();
        assert_eq!(EchoFrame::parse(&frame.encode()).unwrap(), frame);
    }

    #[test]
    fn parse_rejects_short_frames() {
        let err = EchoFrame::parse(&[0x10, 0x81, 0x00]).unwrap_err();
        assert_eq!(
            err,
            EchonetError::FrameTooShort {
                expected: MIN_FRAME_LEN,
                actual: 3
            }
        );
    }

    #[test]
    fn parse_rejects_wrong_header() {
        let mut data = power_response().encode();
        data[1] = 0x82;
        assert_eq!(
            EchoFrame::parse(&data).unwrap_err(),
            EchonetError::BadHeader(0x10, 0x82)
        );
    }

    #[test]
    fn parse_rejects_truncated_property_data() {
        let mut data = power_response().encode();
        data.truncate(data.len() - 2);
        assert!(matches!(
            EchoFrame::parse(&data).unwrap_err(),
            EchonetError::TruncatedProperty { index: 0, .. }
        ));
    }

    #[test]
    fn response_with_swapped_objects_correlates() {
        let req = EchoFrame::get_request(&[EPC_INSTANT_POWER]);
        assert!(req.corresponds_to(&power_response()));
    }

    #[test]
    fn different_property_does_not_correlate() {
        let req = EchoFrame::get_request(&[EPC_INSTANT_CURRENTS]);
        assert!(!req.corresponds_to(&power_response()));
    }

    #[test]
    fn mismatched_source_object_does_not_correlate() {
        let req = EchoFrame::get_request(&[EPC_INSTANT_POWER]);
        let mut res = power_response();
        res.seoj = [0x02, 0x87, 0x01];
        assert!(!req.corresponds_to(&res));
    }
}
