//! Append-only encoder for descriptor records.
//!
//! [`Writer`] is the counterpart of [`crate::wire::Parser`]. Schema messages use it to
//! serialize themselves back into the canonical byte layout; sub-messages are written into a
//! scratch writer first and then embedded with [`Writer::write_message`].

use crate::wire::{Tag, WireType};

/// Growable output buffer producing protocol-buffer binary encoding.
#[derive(Default, Debug, Clone)]
pub struct Writer {
    buffer: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the writer and return the encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Append a raw varint.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write_varint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buffer.push((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.buffer.push(value as u8);
    }

    /// Append a record tag.
    pub fn write_tag(&mut self, number: u32, wire_type: WireType) {
        self.write_varint(Tag::encode(number, wire_type));
    }

    /// Append an `int32` field; negative values are sign-extended to ten bytes.
    #[allow(clippy::cast_sign_loss)]
    pub fn write_int32(&mut self, number: u32, value: i32) {
        self.write_tag(number, WireType::Varint);
        self.write_varint(i64::from(value) as u64);
    }

    /// Append a `bool` field.
    pub fn write_bool(&mut self, number: u32, value: bool) {
        self.write_tag(number, WireType::Varint);
        self.write_varint(u64::from(value));
    }

    /// Append a length-delimited bytes field.
    pub fn write_bytes(&mut self, number: u32, value: &[u8]) {
        self.write_tag(number, WireType::LengthDelimited);
        self.write_varint(value.len() as u64);
        self.buffer.extend_from_slice(value);
    }

    /// Append a string field.
    pub fn write_string(&mut self, number: u32, value: &str) {
        self.write_bytes(number, value.as_bytes());
    }

    /// Append an embedded message produced by `encode`.
    pub fn write_message<F>(&mut self, number: u32, encode: F)
    where
        F: FnOnce(&mut Writer),
    {
        let mut nested = Writer::new();
        encode(&mut nested);
        self.write_bytes(number, &nested.buffer);
    }

    /// Append an optional string field if present.
    pub fn write_opt_string(&mut self, number: u32, value: Option<&str>) {
        if let Some(value) = value {
            self.write_string(number, value);
        }
    }

    /// Append an optional `int32` field if present.
    pub fn write_opt_int32(&mut self, number: u32, value: Option<i32>) {
        if let Some(value) = value {
            self.write_int32(number, value);
        }
    }

    /// Append an optional `bool` field if present.
    pub fn write_opt_bool(&mut self, number: u32, value: Option<bool>) {
        if let Some(value) = value {
            self.write_bool(number, value);
        }
    }

    /// Append optional raw bytes (typically an options message) if present.
    pub fn write_opt_bytes(&mut self, number: u32, value: Option<&[u8]>) {
        if let Some(value) = value {
            self.write_bytes(number, value);
        }
    }
}
