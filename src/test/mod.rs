//! Fixtures shared by the unit tests.
//!
//! `DEPRECATED_PROTO` is the descriptor of `comments/deprecated.proto` exactly as emitted by
//! protoc. `nested_file` and `base_file` are hand-built files exercising nesting, maps,
//! oneofs, extensions, services and a cross-file reference.

use crate::proto::{
    message_options, DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto,
    ExtensionRange, FieldDescriptorProto, FieldLabel, FieldType, FileDescriptorProto,
    MethodDescriptorProto, OneofDescriptorProto, RawOptions, ReservedRange,
    ServiceDescriptorProto,
};

/// protoc output for `comments/deprecated.proto` (proto3, one message, one enum).
pub const DEPRECATED_PROTO: &[u8] = include_bytes!("../../tests/samples/deprecated.pb");

/// The same bytes, gzip compressed.
pub const DEPRECATED_PROTO_GZ: &[u8] = include_bytes!("../../tests/samples/deprecated.pb.gz");

/// Dependency index table for `nested_file` when `base.proto` is its only dependency.
///
/// Symbol space: 0 `Top`, 1 `Outer.Color`, 2 `Outer.Inner.Shade`, 3 `Outer`, 4 `Outer.Inner`,
/// 5 `Outer.LabelsEntry`, 6 `Other`, 7 `base.Level`, 8 `base.Base`.
pub const NESTED_DEP_INDEXES: &[u32] = &[
    4, 1, 5, 8, // Outer: inner, color, labels, base
    2, 3, // Outer.Inner: shade, back
    0, 3, // Other: top, outer
    3, 6, // ext_top: extendee, type
    3, // Outer.ext_nested: extendee
    3, 6, // Svc.Get: input, output
];

// Helper function to create a scalar field
pub fn scalar(name: &str, number: i32, ty: FieldType) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.into()),
        number: Some(number),
        label: Some(FieldLabel::Optional),
        r#type: Some(ty),
        ..Default::default()
    }
}

// Helper function to create a message, group or enum typed field
pub fn reference(name: &str, number: i32, ty: FieldType, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.into()),
        ..scalar(name, number, ty)
    }
}

// Helper function to create an enum
pub fn enumeration(name: &str, values: &[(&str, i32)]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.into()),
        value: values
            .iter()
            .map(|(name, number)| EnumValueDescriptorProto {
                name: Some((*name).into()),
                number: Some(*number),
                options: None,
            })
            .collect(),
        ..Default::default()
    }
}

// Helper function to create a message with the given fields
pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.into()),
        field: fields,
        ..Default::default()
    }
}

// Helper function to create the entry message of a map field
pub fn map_entry(name: &str, key: FieldType, value: FieldDescriptorProto) -> DescriptorProto {
    DescriptorProto {
        options: RawOptions::from_flags(&[(message_options::MAP_ENTRY, true)]),
        ..message(
            name,
            vec![
                scalar("key", 1, key),
                FieldDescriptorProto {
                    name: Some("value".into()),
                    number: Some(2),
                    ..value
                },
            ],
        )
    }
}

/// `base.proto`: package `base`, message `Base`, enum `Level`.
pub fn base_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("base.proto".into()),
        package: Some("base".into()),
        message_type: vec![message("Base", vec![scalar("value", 1, FieldType::String)])],
        enum_type: vec![enumeration("Level", &[("LOW", 0), ("HIGH", 1)])],
        ..Default::default()
    }
}

/// `nest.proto`: package `nest`, importing `base.proto`.
pub fn nested_file() -> FileDescriptorProto {
    let inner = DescriptorProto {
        enum_type: vec![enumeration("Shade", &[("LIGHT", 0), ("DARK", 1)])],
        ..message(
            "Inner",
            vec![
                reference("shade", 1, FieldType::Enum, ".nest.Outer.Inner.Shade"),
                reference("back", 2, FieldType::Message, ".nest.Outer"),
            ],
        )
    };

    let mut name = scalar("name", 6, FieldType::String);
    name.oneof_index = Some(0);
    let mut code = scalar("code", 7, FieldType::Int32);
    code.oneof_index = Some(0);

    let mut labels = reference("labels", 4, FieldType::Message, ".nest.Outer.LabelsEntry");
    labels.label = Some(FieldLabel::Repeated);

    let mut inner_field = reference("inner", 2, FieldType::Message, ".nest.Outer.Inner");
    inner_field.json_name = Some("innerValue".into());

    let mut ext_nested = scalar("ext_nested", 101, FieldType::String);
    ext_nested.extendee = Some(".nest.Outer".into());

    let outer = DescriptorProto {
        nested_type: vec![
            inner,
            map_entry("LabelsEntry", FieldType::String, scalar("", 0, FieldType::Int64)),
        ],
        enum_type: vec![enumeration("Color", &[("RED", 0), ("GREEN", 1)])],
        extension_range: vec![ExtensionRange {
            start: Some(100),
            end: Some(200),
            options: None,
        }],
        extension: vec![ext_nested],
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("choice".into()),
            options: None,
        }],
        reserved_range: vec![ReservedRange {
            start: Some(50),
            end: Some(60),
        }],
        reserved_name: vec!["old".into()],
        ..message(
            "Outer",
            vec![
                scalar("id", 1, FieldType::Int32),
                inner_field,
                reference("color", 3, FieldType::Enum, ".nest.Outer.Color"),
                labels,
                reference("base", 5, FieldType::Message, ".base.Base"),
                name,
                code,
            ],
        )
    };

    let other = message(
        "Other",
        vec![
            reference("top", 1, FieldType::Enum, ".nest.Top"),
            reference("outer", 2, FieldType::Message, ".nest.Outer"),
        ],
    );

    let mut ext_top = reference("ext_top", 100, FieldType::Message, ".nest.Other");
    ext_top.extendee = Some(".nest.Outer".into());

    FileDescriptorProto {
        name: Some("nest.proto".into()),
        package: Some("nest".into()),
        dependency: vec!["base.proto".into()],
        message_type: vec![outer, other],
        enum_type: vec![enumeration("Top", &[("TOP_ZERO", 0), ("TOP_ONE", 1)])],
        service: vec![ServiceDescriptorProto {
            name: Some("Svc".into()),
            method: vec![MethodDescriptorProto {
                name: Some("Get".into()),
                input_type: Some(".nest.Outer".into()),
                output_type: Some(".nest.Other".into()),
                ..Default::default()
            }],
            options: None,
        }],
        extension: vec![ext_top],
        ..Default::default()
    }
}
