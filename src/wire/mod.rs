//! Low-level wire primitives for descriptor bytes.
//!
//! Descriptor bytes use the protocol-buffer binary encoding: a sequence of `(tag, value)`
//! records where the tag packs the field number and a 3-bit wire type. This module provides
//! the two halves needed to bootstrap the descriptor tree without a generic reflective codec:
//!
//! - [`Parser`] - bounds-checked cursor for reading varints, fixed-width values and
//!   length-delimited payloads, and for skipping unknown fields
//! - [`Writer`] - append-only encoder producing the same layout
//!
//! Compressed descriptor payloads are handled by [`crate::utils::decompress`] before they
//! reach the parser.

mod parser;
mod writer;

pub use parser::Parser;
pub use writer::Writer;

use strum::{Display, EnumIter};

use crate::Result;

/// Largest field number representable in a tag.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// The wire type stored in the low three bits of every tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum WireType {
    /// Variable-length integer
    Varint,
    /// Little-endian 8 byte value
    Fixed64,
    /// Length prefixed payload (strings, bytes, sub-messages, packed values)
    LengthDelimited,
    /// Start of a delimited group
    StartGroup,
    /// End of a delimited group
    EndGroup,
    /// Little-endian 4 byte value
    Fixed32,
}

impl WireType {
    /// Decode the wire type from the low three bits of a tag.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for the unused wire types 6 and 7.
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits & 0x7 {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(malformed_error!("Invalid wire type {}", other)),
        }
    }

    /// The three-bit encoding of this wire type.
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            WireType::Varint => 0,
            WireType::Fixed64 => 1,
            WireType::LengthDelimited => 2,
            WireType::StartGroup => 3,
            WireType::EndGroup => 4,
            WireType::Fixed32 => 5,
        }
    }
}

/// A decoded record tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag {
    /// The field number
    pub number: u32,
    /// The wire type of the value that follows
    pub wire_type: WireType,
}

impl Tag {
    /// Combine a field number and wire type into the encoded tag value.
    #[must_use]
    pub fn encode(number: u32, wire_type: WireType) -> u64 {
        (u64::from(number) << 3) | u64::from(wire_type.bits())
    }
}
