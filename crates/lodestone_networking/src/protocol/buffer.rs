//! # Payload Buffers
//!
//! Big-endian primitive encoding shared by every codec.
//!
//! ## Wire Primitives
//!
//! ```text
//! integers / floats   big-endian, fixed width
//! string              u16 length (UTF-16 units) + UTF-16BE units, max 32767
//! byte array          i16 length + raw bytes
//! ```
//!
//! The writer grows a reusable `Vec<u8>`; the reader borrows the input and
//! reports exactly how many bytes a short read was missing.

use crate::error::{ProtocolError, ProtocolResult};

/// Longest string the u16 prefix may announce.
pub const MAX_STRING_UNITS: usize = i16::MAX as usize;

/// Longest byte array the i16 prefix may announce.
pub const MAX_BYTE_ARRAY_LEN: usize = i16::MAX as usize;

/// Packet writer - appends big-endian fields to a growable buffer.
///
/// Reuse one writer across frames with [`PacketWriter::reset`] to keep the
/// allocation.
#[derive(Debug, Default, Clone)]
pub struct PacketWriter {
    buffer: Vec<u8>,
}

impl PacketWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Creates a writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Clears the writer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Drops everything written after the first `len` bytes.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.buffer.truncate(len);
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer, returning the written bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Writes a single unsigned byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a single signed byte.
    #[inline]
    pub fn write_i8(&mut self, value: i8) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a u16.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an i16.
    #[inline]
    pub fn write_i16(&mut self, value: i16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an i32.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an i64.
    #[inline]
    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an f32.
    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an f64.
    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Appends raw bytes with no length prefix.
    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a length-prefixed UTF-16 string.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::StringTooLong`] past 32767 UTF-16 units.
    /// Nothing is written in that case.
    pub fn write_string(&mut self, value: &str) -> ProtocolResult<()> {
        let units = value.encode_utf16().count();
        let Ok(prefix) = u16::try_from(units) else {
            return Err(ProtocolError::StringTooLong(units));
        };
        if units > MAX_STRING_UNITS {
            return Err(ProtocolError::StringTooLong(units));
        }

        self.buffer.reserve(2 + units * 2);
        self.write_u16(prefix);
        for unit in value.encode_utf16() {
            self.write_u16(unit);
        }
        Ok(())
    }

    /// Writes an i16-length-prefixed byte array.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] past 32767 bytes.
    pub fn write_byte_array(&mut self, bytes: &[u8]) -> ProtocolResult<()> {
        let Ok(prefix) = i16::try_from(bytes.len()) else {
            return Err(ProtocolError::Malformed(format!(
                "byte array of {} bytes exceeds {MAX_BYTE_ARRAY_LEN}",
                bytes.len()
            )));
        };
        self.write_i16(prefix);
        self.write_raw(bytes);
        Ok(())
    }
}

/// Packet reader - consumes big-endian fields from a borrowed buffer.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PacketReader<'a> {
    /// Creates a reader positioned at the start of `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Returns the number of bytes consumed so far.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns true once every byte has been consumed.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consumes `count` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] if fewer bytes remain.
    #[inline]
    pub fn read_raw(&mut self, count: usize) -> ProtocolResult<&'a [u8]> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(ProtocolError::Truncated {
                needed: count,
                remaining,
            });
        }
        let slice = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    /// Consumes every remaining byte.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let slice = &self.buffer[self.position.min(self.buffer.len())..];
        self.position = self.buffer.len();
        slice
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> ProtocolResult<[u8; N]> {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(self.read_raw(N)?);
        Ok(bytes)
    }

    /// Reads an unsigned byte.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] at end of input.
    #[inline]
    pub fn read_u8(&mut self) -> ProtocolResult<u8> {
        Ok(u8::from_be_bytes(self.read_array()?))
    }

    /// Reads a signed byte.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] at end of input.
    #[inline]
    pub fn read_i8(&mut self) -> ProtocolResult<i8> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    /// Reads a u16.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] if fewer than 2 bytes remain.
    #[inline]
    pub fn read_u16(&mut self) -> ProtocolResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Reads an i16.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] if fewer than 2 bytes remain.
    #[inline]
    pub fn read_i16(&mut self) -> ProtocolResult<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    /// Reads an i32.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] if fewer than 4 bytes remain.
    #[inline]
    pub fn read_i32(&mut self) -> ProtocolResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Reads an i64.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] if fewer than 8 bytes remain.
    #[inline]
    pub fn read_i64(&mut self) -> ProtocolResult<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Reads an f32.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] if fewer than 4 bytes remain.
    #[inline]
    pub fn read_f32(&mut self) -> ProtocolResult<f32> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    /// Reads an f64.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] if fewer than 8 bytes remain.
    #[inline]
    pub fn read_f64(&mut self) -> ProtocolResult<f64> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Reads a length-prefixed UTF-16 string.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Truncated`] on short input,
    /// [`ProtocolError::StringTooLong`] if the prefix exceeds 32767, and
    /// [`ProtocolError::Malformed`] on unpaired surrogates.
    pub fn read_string(&mut self) -> ProtocolResult<String> {
        let units = usize::from(self.read_u16()?);
        if units > MAX_STRING_UNITS {
            return Err(ProtocolError::StringTooLong(units));
        }

        let bytes = self.read_raw(units * 2)?;
        let decoded: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&decoded)
            .map_err(|_| ProtocolError::Malformed("string is not valid UTF-16".into()))
    }

    /// Reads an i16-length-prefixed byte array.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`] on a negative length,
    /// [`ProtocolError::Truncated`] on short input.
    pub fn read_byte_array(&mut self) -> ProtocolResult<&'a [u8]> {
        let len = self.read_i16()?;
        let Ok(len) = usize::try_from(len) else {
            return Err(ProtocolError::Malformed(format!("negative byte array length {len}")));
        };
        self.read_raw(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_are_big_endian() {
        let mut writer = PacketWriter::new();
        writer.write_i32(0x0102_0304);
        writer.write_u16(0xABCD);
        writer.write_i8(-1);

        assert_eq!(writer.as_slice(), &[0x01, 0x02, 0x03, 0x04, 0xAB, 0xCD, 0xFF]);

        let mut reader = PacketReader::new(writer.as_slice());
        assert_eq!(reader.read_i32().unwrap(), 0x0102_0304);
        assert_eq!(reader.read_u16().unwrap(), 0xABCD);
        assert_eq!(reader.read_i8().unwrap(), -1);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_string_layout() {
        let mut writer = PacketWriter::new();
        writer.write_string("Hi").unwrap();

        assert_eq!(writer.as_slice(), &[0x00, 0x02, 0x00, b'H', 0x00, b'i']);

        let mut reader = PacketReader::new(writer.as_slice());
        assert_eq!(reader.read_string().unwrap(), "Hi");
    }

    #[test]
    fn test_string_outside_bmp() {
        let mut writer = PacketWriter::new();
        writer.write_string("a\u{1F600}").unwrap();

        // One unit for 'a', a surrogate pair for the emoji
        assert_eq!(writer.len(), 2 + 3 * 2);

        let mut reader = PacketReader::new(writer.as_slice());
        assert_eq!(reader.read_string().unwrap(), "a\u{1F600}");
    }

    #[test]
    fn test_string_too_long() {
        let long = "x".repeat(MAX_STRING_UNITS + 1);
        let mut writer = PacketWriter::new();

        assert_eq!(
            writer.write_string(&long),
            Err(ProtocolError::StringTooLong(MAX_STRING_UNITS + 1))
        );
        assert!(writer.is_empty());
    }

    #[test]
    fn test_truncated_reports_shortfall() {
        let mut reader = PacketReader::new(&[0x00, 0x01]);

        assert_eq!(
            reader.read_i32(),
            Err(ProtocolError::Truncated {
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_unpaired_surrogate_is_malformed() {
        let mut reader = PacketReader::new(&[0x00, 0x01, 0xD8, 0x00]);

        assert!(matches!(reader.read_string(), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_byte_array() {
        let mut writer = PacketWriter::new();
        writer.write_byte_array(&[9, 8, 7]).unwrap();
        assert_eq!(writer.as_slice(), &[0x00, 0x03, 9, 8, 7]);

        let mut reader = PacketReader::new(writer.as_slice());
        assert_eq!(reader.read_byte_array().unwrap(), &[9, 8, 7]);

        let mut negative = PacketReader::new(&[0xFF, 0xFF]);
        assert!(matches!(negative.read_byte_array(), Err(ProtocolError::Malformed(_))));
    }
}
