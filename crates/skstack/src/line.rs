//! Line source: turns the modem's receive half into a queue of text lines.

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec};

/// Depth of the line queue between the reader task and the consumer.
pub const LINE_QUEUE_DEPTH: usize = 4;

/// Spawns the task that owns the receive half of the modem stream.
///
/// Every newline-delimited record is forwarded into the returned queue in
/// arrival order. When the stream ends or a read fails, the task exits and the
/// sender drops, closing the queue; consumers must treat a closed queue as a
/// transport failure, never as a timeout.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<String>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_QUEUE_DEPTH);
    tokio::spawn(async move {
        let mut lines = FramedRead::new(reader, LinesCodec::new());
        while let Some(item) = lines.next().await {
            match item {
                Ok(line) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("modem read failed: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn splits_crlf_lines_and_closes_on_eof() {
        let (local, mut remote) = tokio::io::duplex(64);
        let mut rx = spawn_line_reader(local);

        remote.write_all(b"ONE\r\nTWO\r\n").await.unwrap();
        drop(remote);

        assert_eq!(rx.recv().await.as_deref(), Some("ONE"));
        assert_eq!(rx.recv().await.as_deref(), Some("TWO"));
        assert!(rx.recv().await.is_none());
    }
}
