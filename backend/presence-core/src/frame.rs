//! Wire framing for the local IPC channel.
//!
//! A frame is an 8-byte header, opcode then payload length (both
//! little-endian `u32`), followed by `length` payload bytes. The codec never
//! interprets the opcode or the payload; [`Frame::kind`] maps the raw code to
//! an [`Opcode`] for the layers above.

use crate::error::frame::FrameError;

use common::ErrorLocation;

use std::panic::Location;

use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Handshake,
    Frame,
    Close,
    Ping,
    Pong,
}

impl From<Opcode> for u32 {
    fn from(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Handshake => 0,
            Opcode::Frame => 1,
            Opcode::Close => 2,
            Opcode::Ping => 3,
            Opcode::Pong => 4,
        }
    }
}

impl TryFrom<u32> for Opcode {
    type Error = FrameError;

    #[track_caller]
    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Opcode::Handshake),
            1 => Ok(Opcode::Frame),
            2 => Ok(Opcode::Close),
            3 => Ok(Opcode::Ping),
            4 => Ok(Opcode::Pong),
            opcode => Err(FrameError::UnknownOpcode {
                opcode,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// One unit of wire transfer. The opcode is kept raw so unknown codes survive decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(opcode: Opcode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode: opcode.into(),
            payload: payload.into(),
        }
    }

    #[track_caller]
    pub fn kind(&self) -> Result<Opcode, FrameError> {
        Opcode::try_from(self.opcode)
    }
}

/// Encode a frame into header + payload bytes.
///
/// # Errors
///
/// Returns [`FrameError::Oversized`] if the payload does not fit the length field.
#[track_caller]
pub fn encode(frame: &Frame) -> Result<Vec<u8>, FrameError> {
    let length = payload_length(frame.payload.len())?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + frame.payload.len());
    bytes.extend_from_slice(&frame.opcode.to_le_bytes());
    bytes.extend_from_slice(&length.to_le_bytes());
    bytes.extend_from_slice(&frame.payload);
    Ok(bytes)
}

#[track_caller]
pub(crate) fn payload_length(length: usize) -> Result<u32, FrameError> {
    u32::try_from(length).map_err(|_| FrameError::Oversized {
        length,
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    trace!(
        "Writing frame: opcode={}, length={}",
        frame.opcode,
        frame.payload.len()
    );

    let bytes = encode(frame)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read exactly one frame, waiting until all of it has arrived.
///
/// # Errors
///
/// - [`FrameError::Closed`] if the stream ends before the first header byte
/// - [`FrameError::Truncated`] if it ends inside the header or payload
/// - [`FrameError::Io`] for any other read failure
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let received = read_full(reader, &mut header).await?;

    if received == 0 {
        return Err(FrameError::Closed {
            location: ErrorLocation::from(Location::caller()),
        });
    }

    if received < HEADER_LEN {
        return Err(FrameError::Truncated {
            expected: HEADER_LEN,
            received,
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

    // Grow with the data actually received rather than trusting the header.
    let mut payload = Vec::new();
    let received = (&mut *reader)
        .take(length as u64)
        .read_to_end(&mut payload)
        .await?;

    if received < length {
        return Err(FrameError::Truncated {
            expected: length,
            received,
            location: ErrorLocation::from(Location::caller()),
        });
    }

    trace!("Read frame: opcode={opcode}, length={length}");

    Ok(Frame { opcode, payload })
}

/// Fill `buffer` unless EOF comes first. Returns the number of bytes read.
async fn read_full<R>(reader: &mut R, buffer: &mut [u8]) -> Result<usize, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;

    while filled < buffer.len() {
        let read = reader.read(&mut buffer[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }

    Ok(filled)
}
