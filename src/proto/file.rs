//! `FileDescriptorProto`, the root record of descriptor bytes.

use crate::{
    proto::{
        read_int32_list, read_message, read_options, read_string, write_nested, write_options,
        DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, RawOptions, SchemaMessage,
        ServiceDescriptorProto,
    },
    wire::{Parser, Tag, WireType, Writer},
    Result,
};

/// `FileDescriptorProto`: everything declared by one `.proto` file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileDescriptorProto {
    /// 1: `name`, the path of the file relative to its import root
    pub name: Option<String>,
    /// 2: `package`
    pub package: Option<String>,
    /// 3: `dependency`, paths of imported files
    pub dependency: Vec<String>,
    /// 4: `message_type`
    pub message_type: Vec<DescriptorProto>,
    /// 5: `enum_type`
    pub enum_type: Vec<EnumDescriptorProto>,
    /// 6: `service`
    pub service: Vec<ServiceDescriptorProto>,
    /// 7: `extension`
    pub extension: Vec<FieldDescriptorProto>,
    /// 8: `options`
    pub options: Option<RawOptions>,
    /// 9: `source_code_info`, carried opaque
    pub source_code_info: Option<Vec<u8>>,
    /// 10: `public_dependency`, indexes into `dependency`
    pub public_dependency: Vec<i32>,
    /// 11: `weak_dependency`, indexes into `dependency`
    pub weak_dependency: Vec<i32>,
    /// 12: `syntax`, absent for proto2
    pub syntax: Option<String>,
}

impl FileDescriptorProto {
    /// The file path, or `""` if absent.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// The package, or `""` if absent.
    #[must_use]
    pub fn package(&self) -> &str {
        self.package.as_deref().unwrap_or_default()
    }
}

impl SchemaMessage for FileDescriptorProto {
    fn merge_field(&mut self, tag: Tag, parser: &mut Parser<'_>, depth: usize) -> Result<bool> {
        match tag.number {
            1 => self.name = Some(read_string(tag, parser)?),
            2 => self.package = Some(read_string(tag, parser)?),
            3 => self.dependency.push(read_string(tag, parser)?),
            4 => self.message_type.push(read_message(tag, parser, depth)?),
            5 => self.enum_type.push(read_message(tag, parser, depth)?),
            6 => self.service.push(read_message(tag, parser, depth)?),
            7 => self.extension.push(read_message(tag, parser, depth)?),
            8 => read_options(tag, parser, &mut self.options)?,
            9 => {
                Parser::expect(tag, WireType::LengthDelimited)?;
                let bytes = parser.read_bytes()?;
                self.source_code_info
                    .get_or_insert_with(Vec::new)
                    .extend_from_slice(bytes);
            }
            10 => read_int32_list(tag, parser, &mut self.public_dependency)?,
            11 => read_int32_list(tag, parser, &mut self.weak_dependency)?,
            12 => self.syntax = Some(read_string(tag, parser)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_opt_string(1, self.name.as_deref());
        writer.write_opt_string(2, self.package.as_deref());
        for dependency in &self.dependency {
            writer.write_string(3, dependency);
        }
        for message in &self.message_type {
            write_nested(writer, 4, message);
        }
        for enum_type in &self.enum_type {
            write_nested(writer, 5, enum_type);
        }
        for service in &self.service {
            write_nested(writer, 6, service);
        }
        for extension in &self.extension {
            write_nested(writer, 7, extension);
        }
        write_options(writer, 8, self.options.as_ref());
        writer.write_opt_bytes(9, self.source_code_info.as_deref());
        for &index in &self.public_dependency {
            writer.write_int32(10, index);
        }
        for &index in &self.weak_dependency {
            writer.write_int32(11, index);
        }
        writer.write_opt_string(12, self.syntax.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        proto::{field_options, FieldType},
        test::DEPRECATED_PROTO,
    };

    #[test]
    fn decode_deprecated_fixture() {
        let file = FileDescriptorProto::decode(DEPRECATED_PROTO).unwrap();
        assert_eq!(file.name(), "comments/deprecated.proto");
        assert_eq!(file.package(), "goproto.protoc.comments");
        assert_eq!(file.syntax.as_deref(), Some("proto3"));
        assert!(file.dependency.is_empty());

        let message = &file.message_type[0];
        assert_eq!(message.name(), "DeprecatedMessage");
        let field = &message.field[0];
        assert_eq!(field.name(), "deprecated_field");
        assert_eq!(field.r#type, Some(FieldType::String));
        assert!(field
            .options
            .as_ref()
            .unwrap()
            .flag(field_options::DEPRECATED)
            .unwrap());

        assert_eq!(file.enum_type[0].value[0].name(), "DEPRECATED");
    }

    #[test]
    fn reencode_is_byte_identical() {
        let file = FileDescriptorProto::decode(DEPRECATED_PROTO).unwrap();
        assert_eq!(file.encode_to_vec(), DEPRECATED_PROTO);
    }

    #[test]
    fn packed_public_dependency() {
        // dependency "a", "b"; public_dependency packed [1]
        let data = [0x1a, 0x01, b'a', 0x1a, 0x01, b'b', 0x52, 0x01, 0x01];
        let file = FileDescriptorProto::decode(&data).unwrap();
        assert_eq!(file.dependency, vec!["a", "b"]);
        assert_eq!(file.public_dependency, vec![1]);
    }

    #[test]
    fn truncated_file_is_malformed() {
        let truncated = &DEPRECATED_PROTO[..40];
        assert!(FileDescriptorProto::decode(truncated).is_err());
    }
}
