//! The one-request-in-flight polling loop.

use std::time::Duration;

use log::{debug, info};
use tokio::io::AsyncWrite;

use bmeter_echonet::{decode_reading, EchoFrame, MeterReading};
use bmeter_skstack::{NetworkParams, RxUdp, SkClient, SkError};

/// Polls the meter for one property forever. Each cycle sleeps, sends one Get
/// request and, if the modem reported local send success, waits briefly for
/// the correlated reply. A missed cycle is skipped, not fatal; only transport
/// and protocol failures return.
pub async fn run<W: AsyncWrite + Unpin>(
    client: &mut SkClient<W>,
    params: &NetworkParams,
    epc: u8,
    interval: Duration,
    port: u16,
) -> Result<(), SkError> {
    loop {
        tokio::time::sleep(interval).await;
        let request = EchoFrame::get_request(&[epc]);
        let sent = client.send_udp(&params.addr, port, &request.encode()).await?;
        if !sent {
            debug!("modem reported send failure, skipping cycle");
            continue;
        }
        match wait_for_reply(client, &request).await? {
            Some(reading) => report(&reading),
            None => debug!("no correlated reply this cycle"),
        }
    }
}

/// Waits for an `ERXUDP` frame that answers `request` and decodes the value
/// of a requested property.
///
/// `Ok(None)` means this cycle produced nothing usable: the wait timed out, or
/// every frame seen was malformed, uncorrelated or carried no decodable
/// requested property. Only transport failures are errors.
async fn wait_for_reply<W: AsyncWrite + Unpin>(
    client: &mut SkClient<W>,
    request: &EchoFrame,
) -> Result<Option<MeterReading>, SkError> {
    let wait = client.config().response_timeout;
    loop {
        let line = match client.recv_line(wait).await {
            Ok(line) => line,
            Err(SkError::Timeout) => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(rx) = RxUdp::parse(&line) else {
            continue;
        };
        let frame = match EchoFrame::parse(&rx.payload) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("discarding malformed frame: {}", e);
                continue;
            }
        };
        if !request.corresponds_to(&frame) {
            continue;
        }
        for p in &frame.properties {
            if !request.properties.iter().any(|q| q.epc == p.epc) {
                continue;
            }
            if let Ok(reading) = decode_reading(p.epc, &p.edt) {
                return Ok(Some(reading));
            }
        }
        return Ok(None);
    }
}

fn report(reading: &MeterReading) {
    match *reading {
        MeterReading::Power { watts } => info!("{} [W]", watts),
        MeterReading::Currents { r_phase, t_phase } => {
            info!("R-phase: {:.1} [A]", r_phase);
            info!("T-phase: {:.1} [A]", t_phase);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmeter_echonet::{
        Property, EOJ_CONTROLLER, EOJ_SMART_METER, EPC_INSTANT_POWER, ESV_GET_RES, FIXED_TID,
    };
    use bmeter_skstack::SkConfig;
    use tokio::io::AsyncWriteExt;

    fn fast_config() -> SkConfig {
        SkConfig {
            response_timeout: Duration::from_millis(100),
            ..SkConfig::default()
        }
    }

    fn client_over_duplex(
        buf: usize,
    ) -> (
        SkClient<tokio::io::WriteHalf<tokio::io::DuplexStream>>,
        tokio::io::DuplexStream,
    ) {
        let (local, remote) = tokio::io::duplex(buf);
        let (r, w) = tokio::io::split(local);
        (SkClient::new(r, w, fast_config()), remote)
    }

    fn erxudp_line(frame: &EchoFrame) -> String {
        let hex = frame.encode_hex();
        format!(
            "ERXUDP FE80::2801 FE80::1 0E1A 0E1A 001D129012345678 1 0 {:04X} {}",
            hex.len() / 2,
            hex
        )
    }

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

    #[tokio::test]
    async fn reply_timeout_skips_the_cycle() {
        let (mut client, _remote) = client_over_duplex(256);
        let request = EchoFrame::get_request(&[EPC_INSTANT_POWER]);
        let got = wait_for_reply(&mut client, &request).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn correlated_reply_is_decoded() {
        let (mut client, mut remote) = client_over_duplex(1024);
        remote
            .write_all(format!("{}\r\n", erxudp_line(&power_response())).as_bytes())
            .await
            .unwrap();

        let request = EchoFrame::get_request(&[EPC_INSTANT_POWER]);
        let got = wait_for_reply(&mut client, &request).await.unwrap();
        assert_eq!(got, Some(MeterReading::Power { watts: 1000 }));
    }

    #[tokio::test]
    async fn uncorrelated_and_malformed_frames_are_skipped() {
        let (mut client, mut remote) = client_over_duplex(1024);
        let mut uncorrelated = power_response();
        uncorrelated.seoj = [0x02, 0x87, 0x01];
        let script = format!(
            "EVENT 21 FE80::1 00\r\n\
             ERXUDP FE80::2801 FE80::1 0E1A 0E1A 001D129012345678 1 0 0002 1081\r\n\
             {}\r\n{}\r\n",
            erxudp_line(&uncorrelated),
            erxudp_line(&power_response())
        );
        remote.write_all(script.as_bytes()).await.unwrap();

        let request = EchoFrame::get_request(&[EPC_INSTANT_POWER]);
        let got = wait_for_reply(&mut client, &request).await.unwrap();
        assert_eq!(got, Some(MeterReading::Power { watts: 1000 }));
    }
}
