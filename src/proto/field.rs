//! `FieldDescriptorProto`.

use strum::{Display, EnumIter};

use crate::{
    proto::{
        read_bool, read_int32, read_options, read_string, write_options, RawOptions, SchemaMessage,
    },
    wire::{Parser, Tag, Writer},
    Result,
};

/// `FieldDescriptorProto.Label`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum FieldLabel {
    /// `LABEL_OPTIONAL`
    Optional,
    /// `LABEL_REQUIRED`
    Required,
    /// `LABEL_REPEATED`
    Repeated,
}

impl FieldLabel {
    /// Decode the numeric label.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for values outside 1..=3.
    pub fn from_i32(value: i32) -> Result<Self> {
        match value {
            1 => Ok(FieldLabel::Optional),
            2 => Ok(FieldLabel::Required),
            3 => Ok(FieldLabel::Repeated),
            other => Err(malformed_error!("Invalid field label {}", other)),
        }
    }

    /// The numeric label.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            FieldLabel::Optional => 1,
            FieldLabel::Required => 2,
            FieldLabel::Repeated => 3,
        }
    }
}

/// `FieldDescriptorProto.Type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[allow(missing_docs)]
pub enum FieldType {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Group,
    Message,
    Bytes,
    Uint32,
    Enum,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
}

impl FieldType {
    /// Decode the numeric type.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for values outside 1..=18.
    pub fn from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            1 => FieldType::Double,
            2 => FieldType::Float,
            3 => FieldType::Int64,
            4 => FieldType::Uint64,
            5 => FieldType::Int32,
            6 => FieldType::Fixed64,
            7 => FieldType::Fixed32,
            8 => FieldType::Bool,
            9 => FieldType::String,
            10 => FieldType::Group,
            11 => FieldType::Message,
            12 => FieldType::Bytes,
            13 => FieldType::Uint32,
            14 => FieldType::Enum,
            15 => FieldType::Sfixed32,
            16 => FieldType::Sfixed64,
            17 => FieldType::Sint32,
            18 => FieldType::Sint64,
            other => return Err(malformed_error!("Invalid field type {}", other)),
        })
    }

    /// The numeric type.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            FieldType::Double => 1,
            FieldType::Float => 2,
            FieldType::Int64 => 3,
            FieldType::Uint64 => 4,
            FieldType::Int32 => 5,
            FieldType::Fixed64 => 6,
            FieldType::Fixed32 => 7,
            FieldType::Bool => 8,
            FieldType::String => 9,
            FieldType::Group => 10,
            FieldType::Message => 11,
            FieldType::Bytes => 12,
            FieldType::Uint32 => 13,
            FieldType::Enum => 14,
            FieldType::Sfixed32 => 15,
            FieldType::Sfixed64 => 16,
            FieldType::Sint32 => 17,
            FieldType::Sint64 => 18,
        }
    }

    /// Returns `true` for types that reference another declaration.
    #[must_use]
    pub fn is_reference(self) -> bool {
        matches!(self, FieldType::Message | FieldType::Group | FieldType::Enum)
    }
}

/// A field or extension declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldDescriptorProto {
    /// 1: `name`
    pub name: Option<String>,
    /// 2: `extendee`, set for extensions only
    pub extendee: Option<String>,
    /// 3: `number`
    pub number: Option<i32>,
    /// 4: `label`
    pub label: Option<FieldLabel>,
    /// 5: `type`
    pub r#type: Option<FieldType>,
    /// 6: `type_name`, for message, group and enum fields
    pub type_name: Option<String>,
    /// 7: `default_value`, in text form
    pub default_value: Option<String>,
    /// 8: `options`
    pub options: Option<RawOptions>,
    /// 9: `oneof_index`
    pub oneof_index: Option<i32>,
    /// 10: `json_name`
    pub json_name: Option<String>,
    /// 17: `proto3_optional`
    pub proto3_optional: Option<bool>,
}

impl FieldDescriptorProto {
    /// The field name, or `""` if absent.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// The field number, or `0` if absent.
    #[must_use]
    pub fn number(&self) -> i32 {
        self.number.unwrap_or_default()
    }

    /// The label, defaulting to optional.
    #[must_use]
    pub fn label(&self) -> FieldLabel {
        self.label.unwrap_or(FieldLabel::Optional)
    }
}

impl SchemaMessage for FieldDescriptorProto {
    fn merge_field(&mut self, tag: Tag, parser: &mut Parser<'_>, _depth: usize) -> Result<bool> {
        match tag.number {
            1 => self.name = Some(read_string(tag, parser)?),
            2 => self.extendee = Some(read_string(tag, parser)?),
            3 => self.number = Some(read_int32(tag, parser)?),
            4 => self.label = Some(FieldLabel::from_i32(read_int32(tag, parser)?)?),
            5 => self.r#type = Some(FieldType::from_i32(read_int32(tag, parser)?)?),
            6 => self.type_name = Some(read_string(tag, parser)?),
            7 => self.default_value = Some(read_string(tag, parser)?),
            8 => read_options(tag, parser, &mut self.options)?,
            9 => self.oneof_index = Some(read_int32(tag, parser)?),
            10 => self.json_name = Some(read_string(tag, parser)?),
            17 => self.proto3_optional = Some(read_bool(tag, parser)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_opt_string(1, self.name.as_deref());
        writer.write_opt_string(2, self.extendee.as_deref());
        writer.write_opt_int32(3, self.number);
        writer.write_opt_int32(4, self.label.map(FieldLabel::as_i32));
        writer.write_opt_int32(5, self.r#type.map(FieldType::as_i32));
        writer.write_opt_string(6, self.type_name.as_deref());
        writer.write_opt_string(7, self.default_value.as_deref());
        write_options(writer, 8, self.options.as_ref());
        writer.write_opt_int32(9, self.oneof_index);
        writer.write_opt_string(10, self.json_name.as_deref());
        writer.write_opt_bool(17, self.proto3_optional);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn type_numbers_roundtrip() {
        for ty in FieldType::iter() {
            assert_eq!(FieldType::from_i32(ty.as_i32()).unwrap(), ty);
        }
        assert!(FieldType::from_i32(0).is_err());
        assert!(FieldType::from_i32(19).is_err());
        assert!(FieldLabel::from_i32(4).is_err());
    }

    #[test]
    fn decode_field() {
        // name "x", number 1, label optional, type string, json_name "x"
        let data = [
            0x0a, 0x01, b'x', 0x18, 0x01, 0x20, 0x01, 0x28, 0x09, 0x52, 0x01, b'x',
        ];
        let field = FieldDescriptorProto::decode(&data).unwrap();
        assert_eq!(field.name(), "x");
        assert_eq!(field.number(), 1);
        assert_eq!(field.label(), FieldLabel::Optional);
        assert_eq!(field.r#type, Some(FieldType::String));
        assert_eq!(field.json_name.as_deref(), Some("x"));
        assert_eq!(field.encode_to_vec(), data);
    }

    #[test]
    fn invalid_type_is_malformed() {
        let data = [0x28, 0x20];
        assert!(matches!(
            FieldDescriptorProto::decode(&data),
            Err(crate::Error::Malformed { .. })
        ));
    }
}
