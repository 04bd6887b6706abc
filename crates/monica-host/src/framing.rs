//! Native messaging framing.
//!
//! Every message is UTF-8 JSON preceded by its length as a 32-bit unsigned
//! integer in native byte order.

use std::io;

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::messages::{HostRequest, HostResponse};
use crate::router::HostRouter;

/// Largest message the browser accepts from a host.
pub const MAX_OUTGOING_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Message of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read one framed message body.
///
/// Returns `Ok(None)` when input ends cleanly between frames; input ending
/// inside a header or body is an `UnexpectedEof` I/O error. An oversized
/// frame is consumed and discarded before `TooLarge` is returned, so the
/// stream stays aligned.
pub async fn read_message<R>(reader: &mut R, max_bytes: usize) -> Result<Option<Vec<u8>>, FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            debug!("Input ended after {} header byte(s)", filled);
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        filled += n;
    }

    let size = u32::from_ne_bytes(header) as usize;
    if size > max_bytes {
        let mut frame = (&mut *reader).take(size as u64);
        let discarded = tokio::io::copy(&mut frame, &mut tokio::io::sink()).await?;
        if (discarded as usize) < size {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        return Err(FramingError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut body = vec![0u8; size];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Serialize and write one framed message.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_OUTGOING_BYTES {
        return Err(FramingError::TooLarge {
            size: body.len(),
            limit: MAX_OUTGOING_BYTES,
        });
    }

    // Bounded by MAX_OUTGOING_BYTES above.
    let size = body.len() as u32;
    writer.write_all(&size.to_ne_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Answer framed requests until the input ends. Returns the number of
/// requests answered.
///
/// Malformed or oversized requests get an error response; only I/O failures
/// end the loop early.
pub async fn serve<R, W>(
    reader: &mut R,
    writer: &mut W,
    router: &HostRouter,
    max_message_bytes: usize,
) -> Result<usize, FramingError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Native messaging host ready");
    let mut answered = 0;

    loop {
        let response = match read_message(reader, max_message_bytes).await {
            Ok(None) => break,
            Ok(Some(body)) => match serde_json::from_slice::<HostRequest>(&body) {
                Ok(request) => router.handle(request).await,
                Err(e) => {
                    warn!("Malformed request: {}", e);
                    HostResponse::error(format!("Malformed request: {}", e))
                }
            },
            Err(e @ FramingError::TooLarge { .. }) => {
                warn!("Dropped request: {}", e);
                HostResponse::error(e.to_string())
            }
            Err(e) => return Err(e),
        };

        match write_message(writer, &response).await {
            Ok(()) => {}
            Err(e @ FramingError::TooLarge { .. }) => {
                warn!("Response not sent: {}", e);
                write_message(writer, &HostResponse::error(e.to_string())).await?;
            }
            Err(e) => return Err(e),
        }
        answered += 1;
    }

    debug!("Input closed after {} requests", answered);
    Ok(answered)
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
