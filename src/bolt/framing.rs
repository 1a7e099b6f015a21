//! Chunked message framing (§4.6 / C7).
//!
//! Every Bolt message is split into one or more chunks, each prefixed by a
//! big-endian `u16` length, and terminated by a zero-length chunk. Grounded
//! in `genezhang-clickgraph`'s `bolt_protocol::connection` `read_message` /
//! `create_chunks` (same chunk cap, same terminator), generalized to async
//! `tokio` I/O and a configurable maximum assembled-message size.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Error;
use crate::Result;

pub const MAX_CHUNK_SIZE: usize = 65_535;

/// Read one full message (all chunks up to the zero-length terminator).
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R, max_message_size: usize) -> Result<Vec<u8>> {
    let mut message = Vec::new();
    loop {
        let mut len_buf = [0u8; 2];
        reader.read_exact(&mut len_buf).await?;
        let len = u16::from_be_bytes(len_buf) as usize;
        if len == 0 {
            break;
        }
        let mut chunk = vec![0u8; len];
        reader.read_exact(&mut chunk).await?;
        message.extend_from_slice(&chunk);
        if message.len() > max_message_size {
            return Err(Error::ProtocolViolation(format!(
                "message exceeds max_message_size ({max_message_size} bytes)"
            )));
        }
    }
    Ok(message)
}

/// Write one full message, splitting it into `MAX_CHUNK_SIZE`-byte chunks
/// and appending the zero-length terminator.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &[u8]) -> Result<()> {
    if message.is_empty() {
        writer.write_all(&[0x00, 0x00]).await?;
        return Ok(());
    }
    for chunk in message.chunks(MAX_CHUNK_SIZE) {
        writer.write_all(&(chunk.len() as u16).to_be_bytes()).await?;
        writer.write_all(chunk).await?;
    }
    writer.write_all(&[0x00, 0x00]).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrips_small_message() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let payload = vec![0xB0, 0x01, 0x02, 0x03];
        write_message(&mut client, &payload).await.unwrap();
        let received = read_message(&mut server, 1 << 20).await.unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn splits_large_messages_into_multiple_chunks() {
        let (mut client, mut server) = tokio::io::duplex(1 << 20);
        let payload = vec![0xAB; MAX_CHUNK_SIZE + 10];
        write_message(&mut client, &payload).await.unwrap();
        let received = read_message(&mut server, 1 << 20).await.unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn rejects_oversized_messages() {
        let (mut client, mut server) = tokio::io::duplex(1 << 20);
        let payload = vec![0xAB; 128];
        write_message(&mut client, &payload).await.unwrap();
        let err = read_message(&mut server, 32).await.unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
    }
}
