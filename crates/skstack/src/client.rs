//! Command/response transactions against the modem.

use std::time::Duration;

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::line::spawn_line_reader;
use crate::{SkConfig, SkError};

/// Commands of this family complete on their single answer line; the modem
/// never follows it with `OK`.
const NO_TERMINATOR_PREFIX: &str = "SKLL64 ";

/// One SKSTACK transaction channel: writes command lines to the modem and
/// consumes the shared line queue. One command is in flight at a time.
pub struct SkClient<W> {
    writer: W,
    lines: mpsc::Receiver<String>,
    config: SkConfig,
}

impl<W: AsyncWrite + Unpin> SkClient<W> {
    /// Takes ownership of both halves of an already-open modem stream and
    /// starts the line reader on the receive half.
    pub fn new<R>(reader: R, writer: W, config: SkConfig) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            writer,
            lines: spawn_line_reader(reader),
            config,
        }
    }

    pub fn config(&self) -> &SkConfig {
        &self.config
    }

    /// Takes the next line off the queue, waiting at most `wait`.
    pub async fn recv_line(&mut self, wait: Duration) -> Result<String, SkError> {
        match timeout(wait, self.lines.recv()).await {
            Err(_) => Err(SkError::Timeout),
            Ok(None) => Err(SkError::Disconnected),
            Ok(Some(line)) => {
                debug!("<< {}", line);
                Ok(line)
            }
        }
    }

    async fn send_line(&mut self, cmd: &str) -> Result<(), SkError> {
        debug!(">> {}", cmd);
        self.writer.write_all(cmd.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Runs one command transaction.
    ///
    /// Reply lines are accumulated until the terminal `OK`, whose preceding
    /// lines are returned concatenated in arrival order. A `FAIL ` line is a
    /// protocol failure and a closed queue a transport failure; both leave the
    /// control channel unusable. The idle timeout restarts on every line.
    /// `SKLL64` is the documented exception: it completes on its single answer
    /// line with no terminal marker.
    pub async fn execute(&mut self, cmd: &str) -> Result<String, SkError> {
        self.send_line(cmd).await?;
        let single_line = cmd.starts_with(NO_TERMINATOR_PREFIX);
        let wait = self.config.command_timeout;
        let mut res = String::new();
        loop {
            let line = self.recv_line(wait).await?;
            if line == "OK" {
                return Ok(res);
            }
            if line.starts_with("FAIL ") {
                return Err(SkError::CommandFailed(line));
            }
            res.push_str(&line);
            if single_line {
                return Ok(res);
            }
        }
    }

    /// Startup sequence: firmware/device queries, then the B-route credentials.
    pub async fn authenticate(&mut self, route_b_id: &str, password: &str) -> Result<(), SkError> {
        self.execute("SKVER").await?;
        self.execute("SKINFO").await?;
        self.execute(&format!("SKSETPWD C {}", password)).await?;
        self.execute(&format!("SKSETRBID {}", route_b_id)).await?;
        Ok(())
    }

    /// Sends one UDP datagram to the joined peer.
    ///
    /// The payload travels hex-encoded inside the command; the declared length
    /// is the payload's byte count. Returns whether the modem reported local
    /// send success (the `EVENT 21` completion line ends in `00`).
    pub async fn send_udp(
        &mut self,
        dest: &str,
        port: u16,
        payload: &[u8],
    ) -> Result<bool, SkError> {
        let cmd = format!(
            "SKSENDTO 1 {} {:04X} 1 0 {:04X} {}",
            dest,
            port,
            payload.len(),
            hex::encode_upper(payload)
        );
        let status = self.execute(&cmd).await?;
        Ok(status.ends_with(" 00"))
    }
}
