//! `DescriptorProto` and the records nested in it.

use crate::{
    proto::{
        read_int32, read_message, read_options, read_string, write_nested, write_options,
        EnumDescriptorProto, FieldDescriptorProto, RawOptions, SchemaMessage,
    },
    wire::{Parser, Tag, Writer},
    Result,
};

/// `DescriptorProto.ExtensionRange`: a half-open range of extension numbers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionRange {
    /// 1: `start`, inclusive
    pub start: Option<i32>,
    /// 2: `end`, exclusive
    pub end: Option<i32>,
    /// 3: `options`
    pub options: Option<RawOptions>,
}

impl SchemaMessage for ExtensionRange {
    fn merge_field(&mut self, tag: Tag, parser: &mut Parser<'_>, _depth: usize) -> Result<bool> {
        match tag.number {
            1 => self.start = Some(read_int32(tag, parser)?),
            2 => self.end = Some(read_int32(tag, parser)?),
            3 => read_options(tag, parser, &mut self.options)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_opt_int32(1, self.start);
        writer.write_opt_int32(2, self.end);
        write_options(writer, 3, self.options.as_ref());
    }
}

/// `DescriptorProto.ReservedRange`: a half-open range of reserved field numbers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReservedRange {
    /// 1: `start`, inclusive
    pub start: Option<i32>,
    /// 2: `end`, exclusive
    pub end: Option<i32>,
}

impl SchemaMessage for ReservedRange {
    fn merge_field(&mut self, tag: Tag, parser: &mut Parser<'_>, _depth: usize) -> Result<bool> {
        match tag.number {
            1 => self.start = Some(read_int32(tag, parser)?),
            2 => self.end = Some(read_int32(tag, parser)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_opt_int32(1, self.start);
        writer.write_opt_int32(2, self.end);
    }
}

/// `OneofDescriptorProto`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OneofDescriptorProto {
    /// 1: `name`
    pub name: Option<String>,
    /// 2: `options`
    pub options: Option<RawOptions>,
}

impl SchemaMessage for OneofDescriptorProto {
    fn merge_field(&mut self, tag: Tag, parser: &mut Parser<'_>, _depth: usize) -> Result<bool> {
        match tag.number {
            1 => self.name = Some(read_string(tag, parser)?),
            2 => read_options(tag, parser, &mut self.options)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_opt_string(1, self.name.as_deref());
        write_options(writer, 2, self.options.as_ref());
    }
}

/// `DescriptorProto`: a message declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescriptorProto {
    /// 1: `name`
    pub name: Option<String>,
    /// 2: `field`
    pub field: Vec<FieldDescriptorProto>,
    /// 3: `nested_type`
    pub nested_type: Vec<DescriptorProto>,
    /// 4: `enum_type`
    pub enum_type: Vec<EnumDescriptorProto>,
    /// 5: `extension_range`
    pub extension_range: Vec<ExtensionRange>,
    /// 6: `extension`
    pub extension: Vec<FieldDescriptorProto>,
    /// 7: `options`
    pub options: Option<RawOptions>,
    /// 8: `oneof_decl`
    pub oneof_decl: Vec<OneofDescriptorProto>,
    /// 9: `reserved_range`
    pub reserved_range: Vec<ReservedRange>,
    /// 10: `reserved_name`
    pub reserved_name: Vec<String>,
}

impl DescriptorProto {
    /// The message name, or `""` if absent.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

impl SchemaMessage for DescriptorProto {
    fn merge_field(&mut self, tag: Tag, parser: &mut Parser<'_>, depth: usize) -> Result<bool> {
        match tag.number {
            1 => self.name = Some(read_string(tag, parser)?),
            2 => self.field.push(read_message(tag, parser, depth)?),
            3 => self.nested_type.push(read_message(tag, parser, depth)?),
            4 => self.enum_type.push(read_message(tag, parser, depth)?),
            5 => self.extension_range.push(read_message(tag, parser, depth)?),
            6 => self.extension.push(read_message(tag, parser, depth)?),
            7 => read_options(tag, parser, &mut self.options)?,
            8 => self.oneof_decl.push(read_message(tag, parser, depth)?),
            9 => self.reserved_range.push(read_message(tag, parser, depth)?),
            10 => self.reserved_name.push(read_string(tag, parser)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_opt_string(1, self.name.as_deref());
        for field in &self.field {
            write_nested(writer, 2, field);
        }
        for nested in &self.nested_type {
            write_nested(writer, 3, nested);
        }
        for enum_type in &self.enum_type {
            write_nested(writer, 4, enum_type);
        }
        for range in &self.extension_range {
            write_nested(writer, 5, range);
        }
        for extension in &self.extension {
            write_nested(writer, 6, extension);
        }
        write_options(writer, 7, self.options.as_ref());
        for oneof in &self.oneof_decl {
            write_nested(writer, 8, oneof);
        }
        for range in &self.reserved_range {
            write_nested(writer, 9, range);
        }
        for name in &self.reserved_name {
            writer.write_string(10, name);
        }
    }
}
