//! # Frame module
//!
//! Length-prefixed framing used on the command stream. Every frame is a 4 byte little-endian
//! unsigned length followed by that many bytes of payload.
//!
//! Reading is done by a [`FrameReader`], a state machine which is fed whatever bytes the socket
//! produced and hands back complete frames, so that partial reads of the header or body are
//! handled the same way as whole frames.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::io::{self, Write};
use byteorder::{ByteOrder, LittleEndian};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of bytes in the length prefix.
pub const HEADER_LEN: usize = 4;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Incremental reader for length-prefixed frames.
#[derive(Debug)]
pub struct FrameReader {
    state: ReadState,

    /// Maximum accepted body length
    max_frame_len: usize,

    header: [u8; HEADER_LEN],
    header_pos: usize,

    /// Declared length of the frame currently being read
    body_len: usize,
    body: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// States of the [`FrameReader`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadState {
    /// Waiting for (the rest of) the 4 byte length header
    AwaitingSizeHeader,

    /// Header complete, accumulating the body
    ReadingBody,

    /// A frame was just completed and handed out
    Dispatched,

    /// The peer closed the stream, or the stream was invalid. No further frames will be produced.
    Disconnected,
}

/// Errors raised while reading or encoding frames.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame declares a length of {0} bytes, more than the maximum of {1}")]
    FrameTooLarge(usize, usize),

    #[error("The peer closed the connection")]
    Closed,

    #[error("The reader is disconnected and cannot accept more data")]
    ReaderDisconnected,

    #[error("A payload of {0} bytes does not fit in a frame")]
    PayloadTooLarge(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FrameReader {
    /// Create a new reader accepting frame bodies of up to `max_frame_len` bytes.
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            state: ReadState::AwaitingSizeHeader,
            max_frame_len,
            header: [0u8; HEADER_LEN],
            header_pos: 0,
            body_len: 0,
            body: Vec::new(),
        }
    }

    /// Current state of the reader.
    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Feed the bytes from one read into the reader, returning all frames completed by them.
    ///
    /// An empty `bytes` slice means a read of 0 bytes, i.e. the peer closed the connection, which
    /// moves the reader into `Disconnected` and returns `FrameError::Closed`. Any error leaves the
    /// reader disconnected.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<Vec<u8>>, FrameError> {
        if self.state == ReadState::Disconnected {
            return Err(FrameError::ReaderDisconnected)
        }

        if bytes.is_empty() {
            self.state = ReadState::Disconnected;
            return Err(FrameError::Closed)
        }

        let mut frames = Vec::new();
        let mut rest = bytes;

        while !rest.is_empty() {
            if self.state == ReadState::Dispatched {
                self.state = ReadState::AwaitingSizeHeader;
            }

            match self.state {
                ReadState::AwaitingSizeHeader => {
                    let n = (HEADER_LEN - self.header_pos).min(rest.len());
                    self.header[self.header_pos..self.header_pos + n]
                        .copy_from_slice(&rest[..n]);
                    self.header_pos += n;
                    rest = &rest[n..];

                    if self.header_pos == HEADER_LEN {
                        self.start_body()?;

                        // Empty frames complete as soon as their header does
                        if self.body_len == 0 {
                            frames.push(self.finish_frame());
                        }
                    }
                },
                ReadState::ReadingBody => {
                    let n = (self.body_len - self.body.len()).min(rest.len());
                    self.body.extend_from_slice(&rest[..n]);
                    rest = &rest[n..];

                    if self.body.len() == self.body_len {
                        frames.push(self.finish_frame());
                    }
                },
                ReadState::Dispatched | ReadState::Disconnected => unreachable!(),
            }
        }

        Ok(frames)
    }

    fn start_body(&mut self) -> Result<(), FrameError> {
        let len = LittleEndian::read_u32(&self.header) as usize;

        if len > self.max_frame_len {
            self.state = ReadState::Disconnected;
            return Err(FrameError::FrameTooLarge(len, self.max_frame_len))
        }

        self.body_len = len;
        self.body = Vec::with_capacity(len);
        self.header_pos = 0;
        self.state = ReadState::ReadingBody;

        Ok(())
    }

    fn finish_frame(&mut self) -> Vec<u8> {
        self.state = ReadState::Dispatched;
        self.header_pos = 0;
        self.body_len = 0;
        std::mem::take(&mut self.body)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode a payload as a single frame.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let header = encode_header(payload.len())?;

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&header);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Write a payload as a single frame to the writer and flush it.
///
/// Payloads too long for the length header fail with `ErrorKind::InvalidInput` before anything is
/// written.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let header = encode_header(payload.len())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    writer.write_all(&header)?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Length header for a body of `len` bytes.
fn encode_header(len: usize) -> Result<[u8; HEADER_LEN], FrameError> {
    let len = u32::try_from(len).map_err(|_| FrameError::PayloadTooLarge(len))?;

    let mut header = [0u8; HEADER_LEN];
    LittleEndian::write_u32(&mut header, len);
    Ok(header)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::tc::Command;

    #[test]
    fn test_single_chunk() {
        let mut reader = FrameReader::new(1024);
        let frames = reader.push(&encode_frame(b"none|forward#100").unwrap()).unwrap();

        assert_eq!(frames, vec![b"none|forward#100".to_vec()]);
        assert_eq!(reader.state(), ReadState::Dispatched);
    }

    #[test]
    fn test_byte_by_byte_matches_single_chunk() {
        let raw = encode_frame(b"left#20|distance#-4").unwrap();

        let mut chunk_reader = FrameReader::new(1024);
        let whole = chunk_reader.push(&raw).unwrap();

        let mut byte_reader = FrameReader::new(1024);
        let mut pieces = Vec::new();
        for (i, b) in raw.iter().enumerate() {
            pieces.extend(byte_reader.push(std::slice::from_ref(b)).unwrap());

            // Never dispatch before the final byte
            if i < raw.len() - 1 {
                assert!(pieces.is_empty());
                let expected = if i < HEADER_LEN - 1 {
                    ReadState::AwaitingSizeHeader
                } else {
                    ReadState::ReadingBody
                };
                assert_eq!(byte_reader.state(), expected);
            }
        }

        assert_eq!(whole, pieces);

        let parse = |f: &Vec<u8>| Command::parse(std::str::from_utf8(f).unwrap()).unwrap();
        assert_eq!(parse(&whole[0]), parse(&pieces[0]));
    }

    #[test]
    fn test_multiple_frames_in_one_read() {
        let mut raw = encode_frame(b"a").unwrap();
        raw.extend(encode_frame(b"").unwrap());
        raw.extend(encode_frame(b"bcd").unwrap());
        // Start of a 4th frame, header only partially delivered
        raw.extend(&[9, 0]);

        let mut reader = FrameReader::new(16);
        let frames = reader.push(&raw).unwrap();

        assert_eq!(frames, vec![b"a".to_vec(), vec![], b"bcd".to_vec()]);
        assert_eq!(reader.state(), ReadState::AwaitingSizeHeader);

        // The rest of the 4th header and its body complete it
        let frames = reader.push(&[0, 0, b'x']).unwrap();
        assert!(frames.is_empty());
        assert_eq!(reader.state(), ReadState::ReadingBody);
    }

    #[test]
    fn test_zero_read_disconnects() {
        let mut reader = FrameReader::new(16);
        reader.push(&[5, 0, 0, 0, b'x']).unwrap();
        assert_eq!(reader.state(), ReadState::ReadingBody);

        assert_eq!(reader.push(&[]), Err(FrameError::Closed));
        assert_eq!(reader.state(), ReadState::Disconnected);
        assert_eq!(reader.push(b"more"), Err(FrameError::ReaderDisconnected));
    }

    #[test]
    fn test_oversized_frame() {
        let mut reader = FrameReader::new(8);
        assert_eq!(
            reader.push(&encode_frame(&[0u8; 9]).unwrap()),
            Err(FrameError::FrameTooLarge(9, 8))
        );
        assert_eq!(reader.state(), ReadState::Disconnected);
    }

    #[test]
    fn test_write_frame() {
        let mut out = Vec::new();
        write_frame(&mut out, &[1, 2, 3]).unwrap();
        assert_eq!(out, vec![3, 0, 0, 0, 1, 2, 3]);
        assert_eq!(out, encode_frame(&[1, 2, 3]).unwrap());
    }

    #[test]
    fn test_header_length_limit() {
        assert_eq!(encode_header(u32::MAX as usize), Ok([0xFF; HEADER_LEN]));

        #[cfg(target_pointer_width = "64")]
        assert_eq!(
            encode_header(u32::MAX as usize + 1),
            Err(FrameError::PayloadTooLarge(u32::MAX as usize + 1))
        );
    }
}
