use crate::{
    convert::ToProto,
    descriptor::{
        EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FileDescriptor, MessageDescriptor,
        MethodDescriptor, OneofDescriptor, ServiceDescriptor, TypeRef,
    },
    proto::{
        DescriptorProto, EnumDescriptorProto, EnumReservedRange, EnumValueDescriptorProto,
        ExtensionRange, FieldDescriptorProto, FileDescriptorProto, MethodDescriptorProto,
        OneofDescriptorProto, ReservedRange, ServiceDescriptorProto,
    },
};

/// `.full.Name` of a bound reference, otherwise the name as stored.
fn reference_name(bound: Option<&TypeRef>, stored: Option<&str>) -> Option<String> {
    bound
        .map(|target| format!(".{}", target.full_name()))
        .or_else(|| stored.filter(|name| !name.is_empty()).map(str::to_string))
}

#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
fn to_i32(value: usize) -> i32 {
    value as i32
}

impl ToProto for FileDescriptor {
    type Proto = FileDescriptorProto;

    fn to_proto(&self) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(self.path.clone()),
            package: (!self.package.is_empty()).then(|| self.package.clone()),
            dependency: self.dependencies.clone(),
            message_type: self.messages.iter().map(|m| m.to_proto()).collect(),
            enum_type: self.enums.iter().map(|e| e.to_proto()).collect(),
            service: self.services.iter().map(|s| s.to_proto()).collect(),
            extension: self.extensions.iter().map(|x| x.to_proto()).collect(),
            options: self.options.clone(),
            source_code_info: None,
            public_dependency: self.public_dependencies.iter().copied().map(to_i32).collect(),
            weak_dependency: self.weak_dependencies.iter().copied().map(to_i32).collect(),
            syntax: self.syntax.to_field(),
        }
    }
}

impl ToProto for MessageDescriptor {
    type Proto = DescriptorProto;

    fn to_proto(&self) -> DescriptorProto {
        DescriptorProto {
            name: Some(self.name.clone()),
            field: self.fields.iter().map(|f| f.to_proto()).collect(),
            nested_type: self.messages.iter().map(|m| m.to_proto()).collect(),
            enum_type: self.enums.iter().map(|e| e.to_proto()).collect(),
            extension_range: self
                .extension_ranges
                .iter()
                .map(|info| ExtensionRange {
                    start: Some(info.range.start),
                    end: Some(info.range.end),
                    options: info.options.clone(),
                })
                .collect(),
            extension: self.extensions.iter().map(|x| x.to_proto()).collect(),
            options: self.options.clone(),
            oneof_decl: self.oneofs.iter().map(|o| o.to_proto()).collect(),
            reserved_range: self
                .reserved_ranges
                .iter()
                .map(|range| ReservedRange {
                    start: Some(range.start),
                    end: Some(range.end),
                })
                .collect(),
            reserved_name: self.reserved_names.clone(),
        }
    }
}

impl ToProto for FieldDescriptor {
    type Proto = FieldDescriptorProto;

    /// The JSON name is always emitted: the stored one, or the one derived from the name.
    fn to_proto(&self) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(self.name.clone()),
            extendee: if self.is_extension() {
                reference_name(self.extendee(), self.extendee_name.as_deref())
            } else {
                None
            },
            number: Some(self.number),
            label: Some(self.cardinality.into()),
            r#type: Some(self.kind.into()),
            type_name: if self.kind.is_reference() {
                reference_name(self.type_ref(), self.type_name.as_deref())
            } else {
                None
            },
            default_value: self.default_text.clone(),
            options: self.options.clone(),
            oneof_index: self.oneof_index.map(to_i32),
            json_name: Some(self.json_name.clone()),
            proto3_optional: self.is_proto3_optional().then_some(true),
        }
    }
}

impl ToProto for OneofDescriptor {
    type Proto = OneofDescriptorProto;

    fn to_proto(&self) -> OneofDescriptorProto {
        OneofDescriptorProto {
            name: Some(self.name.clone()),
            options: self.options.clone(),
        }
    }
}

impl ToProto for EnumDescriptor {
    type Proto = EnumDescriptorProto;

    fn to_proto(&self) -> EnumDescriptorProto {
        EnumDescriptorProto {
            name: Some(self.name.clone()),
            value: self.values.iter().map(|v| v.to_proto()).collect(),
            options: self.options.clone(),
            reserved_range: self
                .reserved_ranges
                .iter()
                .map(|range| EnumReservedRange {
                    start: Some(*range.start()),
                    end: Some(*range.end()),
                })
                .collect(),
            reserved_name: self.reserved_names.clone(),
        }
    }
}

impl ToProto for EnumValueDescriptor {
    type Proto = EnumValueDescriptorProto;

    fn to_proto(&self) -> EnumValueDescriptorProto {
        EnumValueDescriptorProto {
            name: Some(self.name.clone()),
            number: Some(self.number),
            options: self.options.clone(),
        }
    }
}

impl ToProto for ServiceDescriptor {
    type Proto = ServiceDescriptorProto;

    fn to_proto(&self) -> ServiceDescriptorProto {
        ServiceDescriptorProto {
            name: Some(self.name.clone()),
            method: self.methods.iter().map(|m| m.to_proto()).collect(),
            options: self.options.clone(),
        }
    }
}

impl ToProto for MethodDescriptor {
    type Proto = MethodDescriptorProto;

    fn to_proto(&self) -> MethodDescriptorProto {
        MethodDescriptorProto {
            name: Some(self.name.clone()),
            input_type: reference_name(self.input(), Some(&self.input_name)),
            output_type: reference_name(self.output(), Some(&self.output_name)),
            options: self.options.clone(),
            client_streaming: self.client_streaming.then_some(true),
            server_streaming: self.server_streaming.then_some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::FileBuilder,
        proto::SchemaMessage,
        registry::Registry,
        test::DEPRECATED_PROTO,
    };

    #[test]
    fn protoc_output_reproduced() {
        let registry = Registry::new();
        let file = registry
            .register_raw_file(FileBuilder::new(DEPRECATED_PROTO))
            .unwrap()
            .descriptor()
            .unwrap();

        let proto = file.to_proto();
        assert_eq!(proto, FileDescriptorProto::decode(DEPRECATED_PROTO).unwrap());
        assert_eq!(proto.encode_to_vec(), DEPRECATED_PROTO);
    }

    #[test]
    fn json_name_derived_when_absent() {
        let proto = crate::test::nested_file();
        let file = crate::descriptor::build_file(
            &proto,
            Vec::new(),
            &crate::validation::ValidationConfig::default(),
        )
        .unwrap();
        let outer = file.messages[0].to_proto();
        assert_eq!(outer.field[0].json_name.as_deref(), Some("id"));
        assert_eq!(outer.field[1].json_name.as_deref(), Some("innerValue"));
        // unlinked references keep their stored text
        assert_eq!(outer.field[4].type_name.as_deref(), Some(".base.Base"));
    }
}
