//! Smart meter property codes and value decoding.

use crate::error::EchonetError;

/// Instantaneous electric power: 4-byte unsigned big-endian watts.
pub const EPC_INSTANT_POWER: u8 = 0xE7;
/// Instantaneous currents: two 2-byte unsigned big-endian deci-ampere values,
/// R phase then T phase.
pub const EPC_INSTANT_CURRENTS: u8 = 0xE8;

/// A decoded meter measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeterReading {
    Power { watts: u32 },
    Currents { r_phase: f64, t_phase: f64 },
}

/// Decodes property data by its property code. Widths and representations
/// differ per code, so the code decides the decoder, never the data length.
pub fn decode_reading(epc: u8, edt: &[u8]) -> Result<MeterReading, EchonetError> {
    match epc {
        EPC_INSTANT_POWER => {
            let bytes: [u8; 4] = edt.try_into().map_err(|_| EchonetError::BadPropertyLength {
                epc,
                actual: edt.len(),
            })?;
            Ok(MeterReading::Power {
                watts: u32::from_be_bytes(bytes),
            })
        }
        EPC_INSTANT_CURRENTS => {
            if edt.len() != 4 {
                return Err(EchonetError::BadPropertyLength {
                    epc,
                    actual: edt.len(),
                });
            }
            Ok(MeterReading::Currents {
                r_phase: u16::from_be_bytes([edt[0], edt[1]]) as f64 / 10.0,
                t_phase: u16::from_be_bytes([edt[2], edt[3]]) as f64 / 10.0,
            })
        }
        other => Err(EchonetError::UnknownProperty(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_instantaneous_power() {
        let reading = decode_reading(EPC_INSTANT_POWER, &[0x00, 0x00, 0x03, 0xE8]).unwrap();
        assert_eq!(reading, MeterReading::Power { watts: 1000 });
    }

    #[test]
    fn decodes_instantaneous_currents() {
        let reading = decode_reading(EPC_INSTANT_CURRENTS, &[0x00, 0x0A, 0x00, 0x05]).unwrap();
        assert_eq!(
            reading,
            MeterReading::Currents {
                r_phase: 1.0,
                t_phase: 0.5
            }
        );
    }

    #[test]
    fn rejects_wrong_width() {
        assert_eq!(
            decode_reading(EPC_INSTANT_POWER, &[0x03, 0xE8]).unwrap_err(),
            EchonetError::BadPropertyLength {
                epc: EPC_INSTANT_POWER,
                actual: 2
            }
        );
    }

    #[test]
    fn rejects_unknown_property() {
        assert_eq!(
            decode_reading(0xE0, &[0x00]).unwrap_err(),
            EchonetError::UnknownProperty(0xE0)
        );
    }
}
