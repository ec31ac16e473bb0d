//! `EnumDescriptorProto` and `EnumValueDescriptorProto`.

use crate::{
    proto::{
        read_int32, read_message, read_options, read_string, write_nested, write_options,
        RawOptions, SchemaMessage,
    },
    wire::{Parser, Tag, Writer},
    Result,
};

/// `EnumDescriptorProto.EnumReservedRange`: an inclusive range of reserved numbers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnumReservedRange {
    /// 1: `start`, inclusive
    pub start: Option<i32>,
    /// 2: `end`, inclusive
    pub end: Option<i32>,
}

impl SchemaMessage for EnumReservedRange {
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

/// `EnumValueDescriptorProto`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnumValueDescriptorProto {
    /// 1: `name`
    pub name: Option<String>,
    /// 2: `number`
    pub number: Option<i32>,
    /// 3: `options`
    pub options: Option<RawOptions>,
}

impl EnumValueDescriptorProto {
    /// The value name, or `""` if absent.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

impl SchemaMessage for EnumValueDescriptorProto {
    fn merge_field(&mut self, tag: Tag, parser: &mut Parser<'_>, _depth: usize) -> Result<bool> {
        match tag.number {
            1 => self.name = Some(read_string(tag, parser)?),
            2 => self.number = Some(read_int32(tag, parser)?),
            3 => read_options(tag, parser, &mut self.options)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_opt_string(1, self.name.as_deref());
        writer.write_opt_int32(2, self.number);
        write_options(writer, 3, self.options.as_ref());
    }
}

/// `EnumDescriptorProto`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnumDescriptorProto {
    /// 1: `name`
    pub name: Option<String>,
    /// 2: `value`
    pub value: Vec<EnumValueDescriptorProto>,
    /// 3: `options`
    pub options: Option<RawOptions>,
    /// 4: `reserved_range`
    pub reserved_range: Vec<EnumReservedRange>,
    /// 5: `reserved_name`
    pub reserved_name: Vec<String>,
}

impl EnumDescriptorProto {
    /// The enum name, or `""` if absent.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

impl SchemaMessage for EnumDescriptorProto {
    fn merge_field(&mut self, tag: Tag, parser: &mut Parser<'_>, depth: usize) -> Result<bool> {
        match tag.number {
            1 => self.name = Some(read_string(tag, parser)?),
            2 => self.value.push(read_message(tag, parser, depth)?),
            3 => read_options(tag, parser, &mut self.options)?,
            4 => self.reserved_range.push(read_message(tag, parser, depth)?),
            5 => self.reserved_name.push(read_string(tag, parser)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_opt_string(1, self.name.as_deref());
        for value in &self.value {
            write_nested(writer, 2, value);
        }
        write_options(writer, 3, self.options.as_ref());
        for range in &self.reserved_range {
            write_nested(writer, 4, range);
        }
        for name in &self.reserved_name {
            writer.write_string(5, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_values() {
        let enum_type = EnumDescriptorProto {
            name: Some("Sign".into()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("NEG".into()),
                    number: Some(-1),
                    options: None,
                },
                EnumValueDescriptorProto {
                    name: Some("ZERO".into()),
                    number: Some(0),
                    options: None,
                },
            ],
            reserved_range: vec![EnumReservedRange {
                start: Some(-10),
                end: Some(-5),
            }],
            ..Default::default()
        };

        let decoded = EnumDescriptorProto::decode(&enum_type.encode_to_vec()).unwrap();
        assert_eq!(decoded, enum_type);
        assert_eq!(decoded.value[0].number, Some(-1));
    }
}
