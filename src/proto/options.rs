//! Options messages carried as raw bytes.
//!
//! Options are extensible and only a handful of their fields matter to the descriptor tree,
//! so they are kept verbatim (preserving unknown and custom options for [`crate::convert`])
//! and the well-known boolean flags are scanned on demand.

use crate::{
    wire::{Parser, WireType, Writer},
    Result,
};

/// Field numbers of `FileOptions`.
pub mod file_options {
    /// `deprecated`
    pub const DEPRECATED: u32 = 23;
}

/// Field numbers of `MessageOptions`.
pub mod message_options {
    /// `deprecated`
    pub const DEPRECATED: u32 = 3;
    /// `map_entry`
    pub const MAP_ENTRY: u32 = 7;
}

/// Field numbers of `FieldOptions`.
pub mod field_options {
    /// `packed`
    pub const PACKED: u32 = 2;
    /// `deprecated`
    pub const DEPRECATED: u32 = 3;
    /// `lazy`
    pub const LAZY: u32 = 5;
    /// `weak`
    pub const WEAK: u32 = 10;
}

/// Field numbers of `EnumOptions`.
pub mod enum_options {
    /// `allow_alias`
    pub const ALLOW_ALIAS: u32 = 2;
    /// `deprecated`
    pub const DEPRECATED: u32 = 3;
}

/// Field numbers of `EnumValueOptions`.
pub mod enum_value_options {
    /// `deprecated`
    pub const DEPRECATED: u32 = 1;
}

/// Field numbers of `ServiceOptions`.
pub mod service_options {
    /// `deprecated`
    pub const DEPRECATED: u32 = 33;
}

/// Field numbers of `MethodOptions`.
pub mod method_options {
    /// `deprecated`
    pub const DEPRECATED: u32 = 33;
}

/// The encoded body of an options message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawOptions {
    bytes: Vec<u8>,
}

impl RawOptions {
    /// Wrap encoded option bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        RawOptions { bytes }
    }

    /// Build an options message holding only the given boolean flags.
    ///
    /// Returns `None` if no flag is set, so callers can leave the options field absent.
    #[must_use]
    pub fn from_flags(flags: &[(u32, bool)]) -> Option<Self> {
        let mut writer = Writer::new();
        for &(number, value) in flags {
            if value {
                writer.write_bool(number, true);
            }
        }

        if writer.is_empty() {
            None
        } else {
            Some(RawOptions::new(writer.into_bytes()))
        }
    }

    /// The encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `true` if the options message is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Merge another occurrence of the same options message.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Look up a boolean option; the last occurrence wins.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the options bytes cannot be scanned or the
    /// field is not encoded as a varint.
    pub fn get_bool(&self, number: u32) -> Result<Option<bool>> {
        let mut parser = Parser::new(&self.bytes);
        let mut value = None;

        while parser.has_more_data() {
            let tag = parser.read_tag()?;
            if tag.number == number {
                Parser::expect(tag, WireType::Varint)?;
                value = Some(parser.read_bool()?);
            } else {
                parser.skip(tag)?;
            }
        }

        Ok(value)
    }

    /// Returns `true` if the boolean option is present and set.
    ///
    /// # Errors
    /// Same as [`RawOptions::get_bool`].
    pub fn flag(&self, number: u32) -> Result<bool> {
        Ok(self.get_bool(number)?.unwrap_or(false))
    }
}

/// Scan an optional options message for a flag, treating absence as unset.
pub(crate) fn flag(options: Option<&RawOptions>, number: u32) -> Result<bool> {
    match options {
        Some(options) => options.flag(number),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_occurrence_wins() {
        // deprecated = true, packed = true, deprecated = false
        let options = RawOptions::new(vec![0x18, 0x01, 0x10, 0x01, 0x18, 0x00]);
        assert_eq!(options.get_bool(field_options::DEPRECATED).unwrap(), Some(false));
        assert!(options.flag(field_options::PACKED).unwrap());
        assert_eq!(options.get_bool(field_options::WEAK).unwrap(), None);
    }

    #[test]
    fn unknown_options_are_skipped() {
        // go_package = "x", deprecated = true
        let options = RawOptions::new(vec![0x5a, 0x01, b'x', 0xb8, 0x01, 0x01]);
        assert!(options.flag(file_options::DEPRECATED).unwrap());
    }

    #[test]
    fn wrong_wire_type_is_malformed() {
        let options = RawOptions::new(vec![0x1a, 0x00]);
        assert!(options.get_bool(message_options::DEPRECATED).is_err());
    }

    #[test]
    fn from_flags() {
        assert!(RawOptions::from_flags(&[(message_options::MAP_ENTRY, false)]).is_none());

        let options = RawOptions::from_flags(&[
            (message_options::MAP_ENTRY, true),
            (message_options::DEPRECATED, false),
        ])
        .unwrap();
        assert_eq!(options.as_bytes(), &[0x38, 0x01]);
        assert!(flag(Some(&options), message_options::MAP_ENTRY).unwrap());
        assert!(!flag(None, message_options::MAP_ENTRY).unwrap());
    }
}
