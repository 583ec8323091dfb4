//! RCON packet framing.
//!
//! ```text
//! i32 length     (LE, bytes after this field)
//! i32 request_id (LE)
//! i32 type       (LE)
//! payload        (UTF-8)
//! 0x00 0x00
//! ```

use rcon_core::ProtocolError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Client -> server: authenticate with the payload as password.
pub const AUTH: i32 = 3;

/// Client -> server: run the payload as a console command.
pub const EXEC_COMMAND: i32 = 2;

/// Server -> client: answer to [`AUTH`].
pub const AUTH_RESPONSE: i32 = 2;

/// Server -> client: command output.
pub const RESPONSE_VALUE: i32 = 0;

/// Request id echoed by the server when authentication failed.
pub const UNAUTHENTICATED_ID: i32 = -1;

const LENGTH_PREFIX: usize = 4;
const HEADER_LEN: usize = 8;
const TERMINATOR_LEN: usize = 2;

/// Smallest legal value of the length field: id, type and both terminators.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + TERMINATOR_LEN;

/// One RCON packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub request_id: i32,
    pub packet_type: i32,
    pub body: String,
}

impl Packet {
    /// Create a new packet.
    pub fn new(request_id: i32, packet_type: i32, body: impl Into<String>) -> Self {
        Self {
            request_id,
            packet_type,
            body: body.into(),
        }
    }

    /// Serialize including the length prefix.
    pub fn encode(&self) -> Vec<u8> {
        encode(self.request_id, self.packet_type, self.body.as_bytes())
    }

    /// Parse a frame body, i.e. the `length` bytes that follow the prefix.
    ///
    /// The two trailing terminator bytes are dropped without validation.
    pub fn decode_frame(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < MIN_FRAME_LEN {
            return Err(ProtocolError::Malformed(format!(
                "frame of {} bytes is shorter than the {} byte minimum",
                frame.len(),
                MIN_FRAME_LEN
            )));
        }

        let request_id = read_i32(&frame[0..4]);
        let packet_type = read_i32(&frame[4..8]);
        let body = String::from_utf8_lossy(&frame[HEADER_LEN..frame.len() - TERMINATOR_LEN]).into_owned();

        Ok(Self {
            request_id,
            packet_type,
            body,
        })
    }

    /// Parse one packet from the front of `bytes`, returning it together
    /// with the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), ProtocolError> {
        if bytes.len() < LENGTH_PREFIX {
            return Err(ProtocolError::ConnectionClosed);
        }
        let len = frame_len(read_i32(&bytes[0..LENGTH_PREFIX]), usize::MAX)?;
        let end = LENGTH_PREFIX + len;
        if bytes.len() < end {
            return Err(ProtocolError::ConnectionClosed);
        }
        Ok((Self::decode_frame(&bytes[LENGTH_PREFIX..end])?, end))
    }
}

/// Serialize one packet including the length prefix.
pub fn encode(request_id: i32, packet_type: i32, payload: &[u8]) -> Vec<u8> {
    let len = HEADER_LEN + payload.len() + TERMINATOR_LEN;

    let mut buffer = Vec::with_capacity(LENGTH_PREFIX + len);
    buffer.extend_from_slice(&(len as i32).to_le_bytes());
    buffer.extend_from_slice(&request_id.to_le_bytes());
    buffer.extend_from_slice(&packet_type.to_le_bytes());
    buffer.extend_from_slice(payload);
    buffer.extend_from_slice(&[0, 0]);
    buffer
}

/// Read exactly one packet from the stream.
pub async fn read_packet<R>(reader: &mut R, max_frame_size: usize) -> Result<Packet, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LENGTH_PREFIX];
    reader.read_exact(&mut len_buf).await?;
    let len = frame_len(i32::from_le_bytes(len_buf), max_frame_size)?;

    let mut frame = vec![0u8; len];
    reader.read_exact(&mut frame).await?;
    Packet::decode_frame(&frame)
}

/// Write one packet and flush it.
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&packet.encode()).await?;
    writer.flush().await?;
    Ok(())
}

fn frame_len(declared: i32, max_frame_size: usize) -> Result<usize, ProtocolError> {
    let len = usize::try_from(declared)
        .map_err(|_| ProtocolError::Malformed(format!("negative frame length {}", declared)))?;
    if len < MIN_FRAME_LEN {
        return Err(ProtocolError::Malformed(format!(
            "frame length {} is below the {} byte minimum",
            len, MIN_FRAME_LEN
        )));
    }
    if len > max_frame_size {
        return Err(ProtocolError::Malformed(format!(
            "frame length {} exceeds the {} byte limit",
            len, max_frame_size
        )));
    }
    Ok(len)
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(buf)
}
