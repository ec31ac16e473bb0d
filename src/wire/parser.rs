//! Cursor-based reader for protocol-buffer encoded descriptor bytes.
//!
//! This module provides the [`crate::wire::Parser`] type, a bounds-checked cursor over a byte
//! slice. It knows the handful of encodings the descriptor schema uses and nothing more:
//!
//! - **Varints** - [`Parser::read_varint`], [`Parser::read_int32`], [`Parser::read_bool`]
//! - **Fixed-width values** - [`Parser::read_fixed32`], [`Parser::read_fixed64`]
//! - **Length-delimited payloads** - [`Parser::read_bytes`], [`Parser::read_string`]
//! - **Tags and unknown data** - [`Parser::read_tag`], [`Parser::skip`]
//!
//! # Usage Examples
//!
//! ```rust
//! use protolens::wire::{Parser, WireType};
//!
//! // field 1, length-delimited, "abc"
//! let data = [0x0a, 0x03, b'a', b'b', b'c'];
//! let mut parser = Parser::new(&data);
//!
//! let tag = parser.read_tag()?;
//! assert_eq!(tag.number, 1);
//! assert_eq!(tag.wire_type, WireType::LengthDelimited);
//! assert_eq!(parser.read_string()?, "abc");
//! assert!(!parser.has_more_data());
//! # Ok::<(), protolens::Error>(())
//! ```

use crate::{
    wire::{Tag, WireType, MAX_FIELD_NUMBER},
    Result,
};

/// Maximum nesting of groups that [`Parser::skip`] will follow.
const MAX_GROUP_DEPTH: usize = 64;

/// A binary data parser for reading descriptor records.
///
/// `Parser` maintains an internal position and validates every read against the end of the
/// buffer, so truncated or corrupt input results in [`crate::Error::Malformed`] instead of a
/// panic. Sub-messages are decoded by creating a nested parser over the slice returned from
/// [`Parser::read_bytes`].
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Read a base-128 varint of up to ten bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the buffer ends inside the varint or the varint
    /// is longer than ten bytes.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        for shift in (0..70).step_by(7) {
            let Some(&byte) = self.data.get(self.position) else {
                return Err(malformed_error!(
                    "Truncated varint at offset {}",
                    self.position
                ));
            };
            self.position += 1;

            if shift == 63 && byte > 1 {
                return Err(malformed_error!("Varint overflow at offset {}", self.position));
            }

            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }

        Err(malformed_error!("Varint overflow at offset {}", self.position))
    }

    /// Read an `int32` value (sign-extended to 64 bits on the wire).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the varint is truncated.
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_int32(&mut self) -> Result<i32> {
        Ok(self.read_varint()? as i32)
    }

    /// Read a `bool` value.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the varint is truncated.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_varint()? != 0)
    }

    /// Read a little-endian 4 byte value.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if fewer than four bytes remain.
    pub fn read_fixed32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian 8 byte value.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if fewer than eight bytes remain.
    pub fn read_fixed64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        let mut buffer = [0u8; 8];
        buffer.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buffer))
    }

    /// Read a record tag.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for truncated tags, field number zero, field
    /// numbers beyond the 29-bit range or unknown wire types.
    pub fn read_tag(&mut self) -> Result<Tag> {
        let raw = self.read_varint()?;
        if raw > u64::from(u32::MAX) {
            return Err(malformed_error!("Tag value {} out of range", raw));
        }

        #[allow(clippy::cast_possible_truncation)]
        let raw = raw as u32;
        let number = raw >> 3;
        if number == 0 || number > MAX_FIELD_NUMBER {
            return Err(malformed_error!("Invalid field number {}", number));
        }

        Ok(Tag {
            number,
            wire_type: WireType::from_bits(raw)?,
        })
    }

    /// Read a length-delimited payload and return it as a sub-slice.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the length prefix runs past the buffer.
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let length = self.read_varint()?;
        let length = usize::try_from(length)
            .map_err(|_| malformed_error!("Length prefix {} too large", length))?;
        self.take(length)
    }

    /// Read a length-delimited UTF-8 string.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the payload is truncated or not valid UTF-8.
    pub fn read_string(&mut self) -> Result<&'a str> {
        let offset = self.position;
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes)
            .map_err(|_| malformed_error!("Invalid UTF-8 string at offset {}", offset))
    }

    /// Skip over the value of a record whose tag has already been read.
    ///
    /// Groups are skipped up to and including their matching end-group tag.
    ///
    /// # Arguments
    /// * `tag` - The tag that introduced the value
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the value is truncated, a group is unbalanced, or
    /// an end-group tag appears without a start.
    pub fn skip(&mut self, tag: Tag) -> Result<()> {
        self.skip_value(tag, 0)
    }

    /// Require that the value of a known field uses the expected wire type.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on mismatch.
    pub fn expect(tag: Tag, wire_type: WireType) -> Result<()> {
        if tag.wire_type == wire_type {
            Ok(())
        } else {
            Err(malformed_error!(
                "Field {} has wire type {}, expected {}",
                tag.number,
                tag.wire_type,
                wire_type
            ))
        }
    }

    fn skip_value(&mut self, tag: Tag, depth: usize) -> Result<()> {
        match tag.wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.take(8)?;
            }
            WireType::LengthDelimited => {
                self.read_bytes()?;
            }
            WireType::Fixed32 => {
                self.take(4)?;
            }
            WireType::StartGroup => {
                if depth >= MAX_GROUP_DEPTH {
                    return Err(malformed_error!("Groups nested deeper than {}", MAX_GROUP_DEPTH));
                }
                loop {
                    let inner = self.read_tag()?;
                    if inner.wire_type == WireType::EndGroup {
                        if inner.number != tag.number {
                            return Err(malformed_error!(
                                "Mismatched end group {} for group {}",
                                inner.number,
                                tag.number
                            ));
                        }
                        break;
                    }
                    self.skip_value(inner, depth + 1)?;
                }
            }
            WireType::EndGroup => {
                return Err(malformed_error!("Unexpected end group {}", tag.number));
            }
        }
        Ok(())
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                malformed_error!(
                    "Read of {} bytes at offset {} exceeds buffer of {} bytes",
                    count,
                    self.position,
                    self.data.len()
                )
            })?;

        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn varints() {
        let data = [0x01, 0xac, 0x02, 0xff, 0xff, 0xff, 0xff, 0x0f];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_varint().unwrap(), 1);
        assert_eq!(parser.read_varint().unwrap(), 300);
        assert_eq!(parser.read_varint().unwrap(), u64::from(u32::MAX));
        assert!(!parser.has_more_data());
    }

    #[test]
    fn negative_int32() {
        let data = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_int32().unwrap(), -1);
    }

    #[test]
    fn truncated_varint() {
        let data = [0x80, 0x80];
        let mut parser = Parser::new(&data);
        assert!(matches!(parser.read_varint(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn overlong_varint() {
        let data = [0xff; 11];
        let mut parser = Parser::new(&data);
        assert!(matches!(parser.read_varint(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn length_past_end() {
        let data = [0x0a, 0x05, b'a'];
        let mut parser = Parser::new(&data);
        parser.read_tag().unwrap();
        assert!(parser.read_bytes().is_err());
    }

    #[test]
    fn field_number_zero_rejected() {
        let data = [0x02, 0x00];
        let mut parser = Parser::new(&data);
        assert!(parser.read_tag().is_err());
    }

    #[test]
    fn skip_all_wire_types() {
        let data = [
            0x08, 0x96, 0x01, // 1: varint 150
            0x11, 1, 2, 3, 4, 5, 6, 7, 8, // 2: fixed64
            0x1a, 0x02, 0xaa, 0xbb, // 3: bytes
            0x23, 0x08, 0x01, 0x24, // 4: group { 1: 1 }
            0x2d, 1, 2, 3, 4, // 5: fixed32
            0x30, 0x07, // 6: varint 7
        ];
        let mut parser = Parser::new(&data);
        for _ in 0..5 {
            let tag = parser.read_tag().unwrap();
            parser.skip(tag).unwrap();
        }
        let tag = parser.read_tag().unwrap();
        assert_eq!(tag.number, 6);
        assert_eq!(parser.read_varint().unwrap(), 7);
    }

    #[test]
    fn unbalanced_group() {
        let data = [0x23, 0x08, 0x01, 0x2c];
        let mut parser = Parser::new(&data);
        let tag = parser.read_tag().unwrap();
        assert!(parser.skip(tag).is_err());
    }

    #[test]
    fn invalid_utf8() {
        let data = [0x02, 0xc3, 0x28];
        let mut parser = Parser::new(&data);
        assert!(parser.read_string().is_err());
    }
}
