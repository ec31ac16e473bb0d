//! Schema messages: the `descriptor.proto` records describing a file.
//!
//! The structs in this module mirror `FileDescriptorProto` and its children field by field.
//! They are decoded directly from descriptor bytes with [`crate::wire::Parser`] (the layout of
//! `descriptor.proto` is fixed, so no generic reflective decoder is involved) and encoded back
//! with [`crate::wire::Writer`] in field-number order.
//!
//! # Key Components
//!
//! - [`SchemaMessage`] - decode/encode contract shared by all schema records
//! - [`FileDescriptorProto`] and its children - the skeleton of a file
//! - [`RawOptions`] - options messages carried verbatim, with a scanner for well-known flags
//! - [`FileSeed`] - name-level scan taken when a file is registered
//!
//! # Forward Compatibility
//!
//! Unknown fields are skipped, never rejected. Presence follows proto2 semantics: every
//! singular field is an `Option` and only present fields are written back.
//!
//! # Examples
//!
//! ```rust
//! use protolens::proto::{FileDescriptorProto, SchemaMessage};
//!
//! let file = FileDescriptorProto {
//!     name: Some("a.proto".into()),
//!     package: Some("pkg".into()),
//!     ..Default::default()
//! };
//! let bytes = file.encode_to_vec();
//! assert_eq!(FileDescriptorProto::decode(&bytes)?, file);
//! # Ok::<(), protolens::Error>(())
//! ```

mod enums;
mod field;
mod file;
mod message;
mod options;
mod seed;
mod service;

pub use enums::{EnumDescriptorProto, EnumReservedRange, EnumValueDescriptorProto};
pub use field::{FieldDescriptorProto, FieldLabel, FieldType};
pub use file::FileDescriptorProto;
pub use message::{DescriptorProto, ExtensionRange, OneofDescriptorProto, ReservedRange};
pub use options::{
    enum_options, enum_value_options, field_options, file_options, message_options,
    method_options, service_options, RawOptions,
};
pub(crate) use options::flag as option_flag;
pub use seed::{DeclarationKind, FileSeed, SeedDeclaration};
pub use service::{MethodDescriptorProto, ServiceDescriptorProto};

use crate::{
    wire::{Parser, Tag, WireType, Writer},
    Error, Result,
};

/// Maximum nesting of embedded schema messages accepted while decoding.
pub const MAX_DECODE_DEPTH: usize = 100;

/// A record of the descriptor schema that can be decoded from and encoded to bytes.
pub trait SchemaMessage: Default {
    /// Merge one record into `self`.
    ///
    /// Returns `Ok(false)` for field numbers the message does not know, in which case the
    /// caller skips the value.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for truncated values or unexpected wire types and
    /// [`crate::Error::RecursionLimit`] for excessive nesting.
    fn merge_field(&mut self, tag: Tag, parser: &mut Parser<'_>, depth: usize) -> Result<bool>;

    /// Append the encoding of `self` to `writer`.
    fn encode(&self, writer: &mut Writer);

    /// Decode a message from its encoded bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the bytes cannot be decoded.
    fn decode(data: &[u8]) -> Result<Self> {
        decode_at_depth(data, 0)
    }

    /// Encode the message into a new buffer.
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.encode(&mut writer);
        writer.into_bytes()
    }
}

fn decode_at_depth<M: SchemaMessage>(data: &[u8], depth: usize) -> Result<M> {
    if depth > MAX_DECODE_DEPTH {
        return Err(Error::RecursionLimit(MAX_DECODE_DEPTH));
    }

    let mut message = M::default();
    let mut parser = Parser::new(data);
    while parser.has_more_data() {
        let tag = parser.read_tag()?;
        if !message.merge_field(tag, &mut parser, depth)? {
            parser.skip(tag)?;
        }
    }
    Ok(message)
}

pub(crate) fn read_message<M: SchemaMessage>(
    tag: Tag,
    parser: &mut Parser<'_>,
    depth: usize,
) -> Result<M> {
    Parser::expect(tag, WireType::LengthDelimited)?;
    decode_at_depth(parser.read_bytes()?, depth + 1)
}

pub(crate) fn read_string(tag: Tag, parser: &mut Parser<'_>) -> Result<String> {
    Parser::expect(tag, WireType::LengthDelimited)?;
    Ok(parser.read_string()?.to_string())
}

pub(crate) fn read_int32(tag: Tag, parser: &mut Parser<'_>) -> Result<i32> {
    Parser::expect(tag, WireType::Varint)?;
    parser.read_int32()
}

pub(crate) fn read_bool(tag: Tag, parser: &mut Parser<'_>) -> Result<bool> {
    Parser::expect(tag, WireType::Varint)?;
    parser.read_bool()
}

/// Read a repeated `int32` that may be encoded packed or unpacked.
pub(crate) fn read_int32_list(tag: Tag, parser: &mut Parser<'_>, out: &mut Vec<i32>) -> Result<()> {
    match tag.wire_type {
        WireType::Varint => out.push(parser.read_int32()?),
        WireType::LengthDelimited => {
            let mut packed = Parser::new(parser.read_bytes()?);
            while packed.has_more_data() {
                out.push(packed.read_int32()?);
            }
        }
        _ => Parser::expect(tag, WireType::Varint)?,
    }
    Ok(())
}

/// Read an options message; repeated occurrences merge by concatenation.
pub(crate) fn read_options(
    tag: Tag,
    parser: &mut Parser<'_>,
    current: &mut Option<RawOptions>,
) -> Result<()> {
    Parser::expect(tag, WireType::LengthDelimited)?;
    let bytes = parser.read_bytes()?;
    match current {
        Some(existing) => existing.extend(bytes),
        None => *current = Some(RawOptions::new(bytes.to_vec())),
    }
    Ok(())
}

pub(crate) fn write_nested<M: SchemaMessage>(writer: &mut Writer, number: u32, message: &M) {
    writer.write_message(number, |inner| message.encode(inner));
}

pub(crate) fn write_options(writer: &mut Writer, number: u32, options: Option<&RawOptions>) {
    writer.write_opt_bytes(number, options.map(RawOptions::as_bytes));
}
