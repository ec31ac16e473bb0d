//! Schema message encoding and tree conversion in both directions.

use std::{fs, path::PathBuf};

use protolens::{
    convert::{from_proto, from_proto_with_config, ToProto},
    descriptor::{Descriptor, FileRc, Kind},
    proto::{
        DescriptorProto, FieldDescriptorProto, FieldLabel, FieldType, FileDescriptorProto,
        ReservedRange, SchemaMessage,
    },
    Error, FileBuilder, Registry, ValidationConfig,
};

fn deprecated_bytes() -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/samples/deprecated.pb");
    fs::read(path).unwrap()
}

fn field(name: &str, number: i32, ty: FieldType) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.into()),
        number: Some(number),
        label: Some(FieldLabel::Optional),
        r#type: Some(ty),
        ..Default::default()
    }
}

fn single_message_file(path: &str, package: &str, message: DescriptorProto) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(path.into()),
        package: Some(package.into()),
        message_type: vec![message],
        ..Default::default()
    }
}

#[test]
fn decode_encode_decode_is_stable() {
    let bytes = deprecated_bytes();
    let decoded = FileDescriptorProto::decode(&bytes).unwrap();
    let encoded = decoded.encode_to_vec();
    assert_eq!(FileDescriptorProto::decode(&encoded).unwrap(), decoded);
    assert_eq!(encoded, bytes);
}

#[test]
fn converted_tree_agrees_with_built_tree() {
    let registry = Registry::new();
    let built = registry
        .register_raw_file(FileBuilder::new(deprecated_bytes()))
        .unwrap()
        .descriptor()
        .unwrap();

    let converted = from_proto(&built.to_proto(), &Vec::<FileRc>::new()).unwrap();
    assert_eq!(converted.path, built.path);
    assert_eq!(converted.package, built.package);
    assert_eq!(converted.syntax, built.syntax);
    assert_eq!(converted.deprecated, built.deprecated);

    for (a, b) in converted.messages.iter().zip(&built.messages) {
        assert_eq!(a.full_name(), b.full_name());
        assert_eq!(a.deprecated, b.deprecated);
        for (x, y) in a.fields.iter().zip(&b.fields) {
            assert_eq!(x.full_name(), y.full_name());
            assert_eq!(x.number, y.number);
            assert_eq!(x.kind, y.kind);
            assert_eq!(x.cardinality, y.cardinality);
            assert_eq!(x.json_name, y.json_name);
            assert_eq!(x.flags, y.flags);
        }
    }
    for (a, b) in converted.enums.iter().zip(&built.enums) {
        assert_eq!(a.full_name(), b.full_name());
        assert_eq!(a.values.len(), b.values.len());
        assert_eq!(a.values[0].deprecated, b.values[0].deprecated);
    }
    assert_eq!(converted.to_proto(), built.to_proto());
}

#[test]
fn relative_names_resolve_innermost_first() {
    let base = single_message_file(
        "base.proto",
        "base",
        DescriptorProto {
            name: Some("Base".into()),
            field: vec![field("id", 1, FieldType::Int64)],
            ..Default::default()
        },
    );
    let base = from_proto(&base, &Vec::<FileRc>::new()).unwrap();

    let mut user = single_message_file(
        "base/user.proto",
        "base.users",
        DescriptorProto {
            name: Some("User".into()),
            field: vec![FieldDescriptorProto {
                type_name: Some("Base".into()),
                ..field("base", 1, FieldType::Message)
            }],
            ..Default::default()
        },
    );
    user.dependency.push("base.proto".into());

    let files = vec![base];
    let user = from_proto(&user, &files).unwrap();
    let target = user.messages[0].fields[0].message_type().unwrap();
    assert_eq!(target.full_name(), "base.Base");

    // the stored name becomes fully qualified on the way out
    let proto = user.to_proto();
    assert_eq!(
        proto.message_type[0].field[0].type_name.as_deref(),
        Some(".base.Base")
    );
}

#[test]
fn semantic_violations_are_rejected() {
    let resolver = Vec::<FileRc>::new();

    let duplicate = single_message_file(
        "dup.proto",
        "dup",
        DescriptorProto {
            name: Some("Dup".into()),
            field: vec![field("a", 1, FieldType::Int32), field("b", 1, FieldType::Int32)],
            ..Default::default()
        },
    );
    assert!(matches!(
        from_proto(&duplicate, &resolver),
        Err(Error::SemanticViolation(_))
    ));

    let reserved_block = single_message_file(
        "block.proto",
        "block",
        DescriptorProto {
            name: Some("Block".into()),
            field: vec![field("a", 19_500, FieldType::Int32)],
            ..Default::default()
        },
    );
    assert!(matches!(
        from_proto(&reserved_block, &resolver),
        Err(Error::SemanticViolation(_))
    ));

    let declared_reservation = single_message_file(
        "reserved.proto",
        "reserved",
        DescriptorProto {
            name: Some("Reserved".into()),
            field: vec![field("a", 5, FieldType::Int32)],
            reserved_range: vec![ReservedRange {
                start: Some(4),
                end: Some(6),
            }],
            ..Default::default()
        },
    );
    assert!(matches!(
        from_proto(&declared_reservation, &resolver),
        Err(Error::SemanticViolation(_))
    ));
    // with the checks switched off the same schema converts
    let relaxed = from_proto_with_config(
        &declared_reservation,
        &resolver,
        &ValidationConfig::minimal(),
    )
    .unwrap();
    assert_eq!(relaxed.messages[0].fields[0].kind, Kind::Int32);

    let unresolved = single_message_file(
        "unresolved.proto",
        "unresolved",
        DescriptorProto {
            name: Some("Holder".into()),
            field: vec![FieldDescriptorProto {
                type_name: Some("Missing".into()),
                ..field("missing", 1, FieldType::Message)
            }],
            ..Default::default()
        },
    );
    assert!(matches!(
        from_proto(&unresolved, &resolver),
        Err(Error::UnresolvedReference(_))
    ));
}

#[test]
fn registered_tree_keeps_its_bytes() {
    let registry = Registry::new();
    let bytes = deprecated_bytes();
    let proto = FileDescriptorProto::decode(&bytes).unwrap();
    let file = from_proto(&proto, &registry).unwrap();
    let handle = registry.register_file(file.clone()).unwrap();

    assert!(handle.is_built());
    assert_eq!(handle.path(), "comments/deprecated.proto");
    assert_eq!(handle.bytes(), bytes.as_slice());
    assert!(std::sync::Arc::ptr_eq(&handle.descriptor().unwrap(), &file));
    assert!(registry
        .find_descriptor_by_name("goproto.protoc.comments.DeprecatedEnum")
        .is_some());
}
