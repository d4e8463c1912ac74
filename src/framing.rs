//! Length-prefixed binary framing.
//!
//! Every length on the wire is a 4-byte big-endian unsigned integer.

use crate::error::CryptorError;

pub const LENGTH_PREFIX_LEN: usize = 4;

/// Prefix `payload` with its length.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, CryptorError> {
    let mut framed = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    put_chunk(&mut framed, payload)?;
    Ok(framed)
}

/// Read the length prefix and return exactly that many following bytes.
///
/// Bytes past the declared payload are ignored.
pub fn decode(framed: &[u8]) -> Result<&[u8], CryptorError> {
    FrameReader::new(framed).read_chunk()
}

/// Append `bytes` to `out` as a length-prefixed chunk.
pub fn put_chunk(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), CryptorError> {
    let len = u32::try_from(bytes.len()).map_err(|_| {
        CryptorError::InvalidParameters(format!("chunk of {} bytes is too long to frame", bytes.len()))
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

/// Cursor over a framed byte sequence.
#[derive(Debug)]
pub struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Everything read so far, as a slice of the input.
    pub fn consumed(&self) -> &'a [u8] {
        &self.buf[..self.pos]
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn read_u32(&mut self) -> Result<u32, CryptorError> {
        let bytes = self.take(LENGTH_PREFIX_LEN, "length prefix")?;
        let mut raw = [0u8; LENGTH_PREFIX_LEN];
        raw.copy_from_slice(bytes);
        Ok(u32::from_be_bytes(raw))
    }

    /// Read a length prefix and the chunk it announces.
    pub fn read_chunk(&mut self) -> Result<&'a [u8], CryptorError> {
        let len = self.read_u32()? as usize;
        self.take(len, "chunk")
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], CryptorError> {
        let available = self.buf.len() - self.pos;
        if available < len {
            return Err(CryptorError::Malformed(format!(
                "{} declares {} bytes at offset {}, only {} available",
                what, len, self.pos, available
            )));
        }
        let chunk = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(chunk)
    }
}
