//! Byte-at-a-time response writer.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// A write failed partway through a slow response.
#[derive(Debug, thiserror::Error)]
#[error("writing response at byte {offset}: {source}")]
pub struct SlowWriteError {
    pub offset: usize,
    #[source]
    pub source: io::Error,
}

/// Hand-written HTTP/1.1 response framing `body`.
pub fn build_response(host: &str, body: &[u8]) -> Vec<u8> {
    let head = format!(
        "HTTP/1.1 200 OK\r\nHost: {host}\r\nContent-Length: {}\r\nContent-Type: text/plain\r\n\r\n",
        body.len()
    );
    let mut response = Vec::with_capacity(head.len() + body.len());
    response.extend_from_slice(head.as_bytes());
    response.extend_from_slice(body);
    response
}

/// Write `bytes` one at a time, pausing `interval` between bytes and flushing
/// after each so nothing is coalesced in user-space buffers.
pub async fn write_slowly<W>(
    writer: &mut W,
    bytes: &[u8],
    interval: Duration,
) -> Result<(), SlowWriteError>
where
    W: AsyncWrite + Unpin,
{
    for (offset, byte) in bytes.iter().enumerate() {
        if offset > 0 {
            tokio::time::sleep(interval).await;
        }
        let step = async {
            writer.write_all(std::slice::from_ref(byte)).await?;
            writer.flush().await
        };
        step.await.map_err(|source| SlowWriteError { offset, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::AsyncReadExt;

    #[test]
    fn response_framing() {
        let response = build_response("example.test:7080", b"abc");
        assert_eq!(
            response,
            b"HTTP/1.1 200 OK\r\nHost: example.test:7080\r\nContent-Length: 3\r\nContent-Type: text/plain\r\n\r\nabc"
        );
    }

    #[tokio::test]
    async fn paces_every_byte() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let payload = b"slowly".to_vec();
        let interval = Duration::from_millis(20);

        let started = Instant::now();
        let writer = tokio::spawn(async move {
            write_slowly(&mut server, &payload, interval).await
        });

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        writer.await.unwrap().unwrap();

        assert_eq!(received, b"slowly");
        assert!(started.elapsed() >= interval * 5);
    }

    #[tokio::test]
    async fn reports_offset_of_failed_write() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        let err = write_slowly(&mut server, b"xyz", Duration::from_millis(1))
            .await
            .unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.source.kind(), io::ErrorKind::BrokenPipe);
    }
}
