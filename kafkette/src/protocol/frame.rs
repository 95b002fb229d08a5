//! Length-prefixed framing
//!
//! Every request and response on the wire is a 4-byte big-endian length
//! followed by exactly that many payload bytes.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{ProtocolError, Result};

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Default upper bound on a single request payload (100MB)
pub const DEFAULT_MAX_FRAME_BYTES: usize = 100 * 1024 * 1024;

/// Reads one frame and returns its payload without the length prefix
///
/// Partial reads are retried until the declared length has been collected.
///
/// # Arguments
/// * `reader` - Byte source, normally the read half of a TCP stream
/// * `max_frame_bytes` - Largest payload accepted before any allocation
///
/// # Returns
/// * `Ok(Some(Bytes))` - Payload of exactly the declared length
/// * `Ok(None)` - The peer closed the stream cleanly between frames
/// * `Err(ProtocolError::Framing)` - The stream ended or failed mid-frame,
///   or the declared length exceeds `max_frame_bytes`
pub async fn read_frame<R>(reader: &mut R, max_frame_bytes: usize) -> Result<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    let mut size_buf = [0u8; LENGTH_PREFIX_BYTES];
    let mut filled = 0;
    while filled < LENGTH_PREFIX_BYTES {
        let n = reader
            .read(&mut size_buf[filled..])
            .await
            .map_err(|e| ProtocolError::Framing(format!("failed to read message size: {}", e)))?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ProtocolError::Framing(format!(
                "connection closed after {} of {} length prefix bytes",
                filled, LENGTH_PREFIX_BYTES
            )));
        }
        filled += n;
    }

    let message_size = u32::from_be_bytes(size_buf) as usize;
    if message_size > i32::MAX as usize {
        return Err(ProtocolError::Framing(format!(
            "message size {} is negative as int32",
            message_size
        )));
    }
    if message_size > max_frame_bytes {
        return Err(ProtocolError::Framing(format!(
            "message size {} exceeds limit of {} bytes",
            message_size, max_frame_bytes
        )));
    }

    let mut payload = vec![0u8; message_size];
    reader.read_exact(&mut payload).await.map_err(|e| {
        ProtocolError::Framing(format!(
            "failed to read {} byte message payload: {}",
            message_size, e
        ))
    })?;

    debug!("Read frame of {} bytes", message_size);
    Ok(Some(Bytes::from(payload)))
}

/// Writes `body` as one frame: the length prefix, then the body
///
/// Prefix and body go out as two separate writes, followed by a flush.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let message_size = u32::try_from(body.len()).map_err(|_| {
        ProtocolError::Encoding(format!("response of {} bytes is too large", body.len()))
    })?;

    writer.write_all(&message_size.to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;

    debug!("Wrote frame of {} bytes", message_size);
    Ok(())
}
