//! A legacy type and the decoded descriptor of the same schema describe the same thing.

use std::{fs, path::PathBuf};

use protolens::{
    convert::from_proto,
    descriptor::{Descriptor, FieldRc, FileRc, Syntax},
    legacy::{FieldMetadata, LegacyEnum, LegacyMessage, LegacyType, ValueShape},
    proto::{
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        FieldLabel, FieldType, FileDescriptorProto,
    },
    Error, FileBuilder, Registry, TypeHandle,
};

// comments/deprecated.proto as an old generator described it
struct DeprecatedMessage;
struct DeprecatedEnum;

impl LegacyMessage for DeprecatedMessage {
    fn runtime_name() -> &'static str {
        "DeprecatedMessage"
    }

    fn package() -> Option<&'static str> {
        Some("goproto.protoc.comments")
    }

    fn fields() -> Vec<FieldMetadata> {
        vec![FieldMetadata::new(
            "DeprecatedField",
            "bytes,1,opt,name=deprecated_field,json=deprecatedField,proto3,deprecated",
            ValueShape::String,
        )]
    }
}

impl LegacyEnum for DeprecatedEnum {
    fn runtime_name() -> &'static str {
        "DeprecatedEnum"
    }

    fn package() -> Option<&'static str> {
        Some("goproto.protoc.comments")
    }

    fn values() -> Vec<(&'static str, i32)> {
        vec![("DEPRECATED", 0)]
    }
}

// a small address book with maps, oneofs, nesting and recursion
struct Person;
struct PersonPhone;
struct PhoneType;

impl LegacyMessage for Person {
    fn runtime_name() -> &'static str {
        "Person"
    }

    fn package() -> Option<&'static str> {
        Some("book")
    }

    fn fields() -> Vec<FieldMetadata> {
        vec![
            FieldMetadata::new("Name", "bytes,1,opt,name=name", ValueShape::String),
            FieldMetadata::new("Id", "varint,2,req,name=id", ValueShape::I32),
            FieldMetadata::new(
                "Phones",
                "bytes,4,rep,name=phones",
                ValueShape::Message(LegacyType::message::<PersonPhone>()),
            ),
            FieldMetadata::map(
                "Notes",
                "bytes,5,rep,name=notes",
                FieldMetadata::new("", "varint,1,opt,name=key", ValueShape::U32),
                FieldMetadata::new("", "bytes,2,opt,name=value", ValueShape::String),
            ),
            FieldMetadata::new(
                "Manager",
                "bytes,6,opt,name=manager",
                ValueShape::Message(LegacyType::message::<Person>()),
            ),
            FieldMetadata::new("Email", "bytes,7,opt,name=email", ValueShape::String)
                .in_oneof("contact"),
            FieldMetadata::new("Pager", "fixed32,8,opt,name=pager", ValueShape::U32)
                .in_oneof("contact"),
        ]
    }

    fn oneof_names() -> Vec<&'static str> {
        vec!["contact"]
    }
}

impl LegacyMessage for PersonPhone {
    fn runtime_name() -> &'static str {
        "Person_Phone"
    }

    fn enclosing_type() -> Option<LegacyType> {
        Some(LegacyType::message::<Person>())
    }

    fn fields() -> Vec<FieldMetadata> {
        vec![
            FieldMetadata::new("Number", "bytes,1,opt,name=number", ValueShape::String),
            FieldMetadata::new(
                "Type",
                "varint,2,opt,name=type,enum=book.Person_PhoneType,def=HOME",
                ValueShape::Enum(LegacyType::enumeration::<PhoneType>()),
            ),
        ]
    }
}

impl LegacyEnum for PhoneType {
    fn runtime_name() -> &'static str {
        "Person_PhoneType"
    }

    fn enclosing_type() -> Option<LegacyType> {
        Some(LegacyType::message::<Person>())
    }

    fn values() -> Vec<(&'static str, i32)> {
        vec![("WORK", 2), ("MOBILE", 0), ("HOME", 1)]
    }
}

// generators of that era wrote enum defaults as numbers
struct Call;
struct CallKind;

impl LegacyMessage for Call {
    fn runtime_name() -> &'static str {
        "Call"
    }

    fn package() -> Option<&'static str> {
        Some("p")
    }

    fn fields() -> Vec<FieldMetadata> {
        vec![FieldMetadata::new(
            "Kind",
            "varint,1,opt,name=kind,json=kind,enum=p.Call_Kind,def=1",
            ValueShape::Enum(LegacyType::enumeration::<CallKind>()),
        )]
    }
}

impl LegacyEnum for CallKind {
    fn runtime_name() -> &'static str {
        "Call_Kind"
    }

    fn enclosing_type() -> Option<LegacyType> {
        Some(LegacyType::message::<Call>())
    }

    fn values() -> Vec<(&'static str, i32)> {
        vec![("MOBILE", 0), ("HOME", 1)]
    }
}

struct BadDefault;

impl LegacyMessage for BadDefault {
    fn runtime_name() -> &'static str {
        "BadDefault"
    }

    fn fields() -> Vec<FieldMetadata> {
        vec![FieldMetadata::new(
            "Kind",
            "varint,1,opt,name=kind,def=9",
            ValueShape::Enum(LegacyType::enumeration::<CallKind>()),
        )]
    }
}

struct Unparsable;

impl LegacyMessage for Unparsable {
    fn runtime_name() -> &'static str {
        "Unparsable"
    }

    fn fields() -> Vec<FieldMetadata> {
        vec![FieldMetadata::new("X", "tachyon,1,opt", ValueShape::I32)]
    }
}

fn decoded_registry() -> Registry {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/samples/deprecated.pb");
    let registry = Registry::new();
    registry
        .register_raw_file(FileBuilder::new(fs::read(path).unwrap()))
        .unwrap();
    registry
}

fn assert_same_field(legacy: &FieldRc, decoded: &FieldRc) {
    assert_eq!(legacy.full_name(), decoded.full_name());
    assert_eq!(legacy.number, decoded.number);
    assert_eq!(legacy.kind, decoded.kind);
    assert_eq!(legacy.cardinality, decoded.cardinality);
    assert_eq!(legacy.json_name, decoded.json_name);
    assert_eq!(legacy.default_value, decoded.default_value);
    assert_eq!(legacy.is_deprecated(), decoded.is_deprecated());
    assert_eq!(legacy.oneof_index, decoded.oneof_index);
    assert_eq!(
        legacy.type_ref().map(|target| target.full_name().to_string()),
        decoded.type_ref().map(|target| target.full_name().to_string())
    );
}

#[test]
fn legacy_message_matches_decoded() {
    let decoded_registry = decoded_registry();
    let decoded = decoded_registry
        .find_descriptor_by_name("goproto.protoc.comments.DeprecatedMessage")
        .unwrap();
    let decoded = decoded.as_message().unwrap();

    let legacy_registry = Registry::new();
    let legacy = legacy_registry
        .register_legacy_message::<DeprecatedMessage>()
        .unwrap();

    assert_eq!(legacy.full_name(), decoded.full_name());
    assert_eq!(legacy.syntax, Syntax::Proto3);
    assert_eq!(legacy.syntax, decoded.syntax);
    assert_eq!(legacy.fields.len(), decoded.fields.len());
    for (legacy, decoded) in legacy.fields.iter().zip(&decoded.fields) {
        assert_same_field(legacy, decoded);
    }

    // legacy descriptors have no file but are found by name and by handle
    assert!(legacy.parent_file().is_none());
    let found = legacy_registry
        .find_descriptor_by_name("goproto.protoc.comments.DeprecatedMessage")
        .unwrap();
    assert!(found.ptr_eq(&protolens::descriptor::DescriptorRef::Message(legacy.clone())));
    assert_eq!(
        legacy_registry.find_type_by_name("goproto.protoc.comments.DeprecatedMessage"),
        Some(TypeHandle::of::<DeprecatedMessage>())
    );
}

#[test]
fn legacy_enum_matches_decoded() {
    let decoded_registry = decoded_registry();
    let decoded = decoded_registry
        .find_descriptor_by_name("goproto.protoc.comments.DeprecatedEnum")
        .unwrap();
    let decoded = decoded.as_enum().unwrap();

    let legacy = Registry::new().register_legacy_enum::<DeprecatedEnum>().unwrap();
    assert_eq!(legacy.full_name(), decoded.full_name());
    let pairs = |values: &[protolens::descriptor::EnumValueRc]| {
        values
            .iter()
            .map(|value| (value.full_name().to_string(), value.number))
            .collect::<Vec<_>>()
    };
    assert_eq!(pairs(&legacy.values), pairs(&decoded.values));
}

#[test]
fn legacy_name_clashing_with_a_file_is_rejected() {
    let registry = decoded_registry();
    assert!(matches!(
        registry.register_legacy_message::<DeprecatedMessage>(),
        Err(Error::NameConflict(_))
    ));

    // and the other way round: a file may not redeclare a legacy type's name
    let registry = Registry::new();
    let legacy = registry
        .register_legacy_message::<DeprecatedMessage>()
        .unwrap();
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/samples/deprecated.pb");
    assert!(matches!(
        registry.register_raw_file(FileBuilder::new(fs::read(path).unwrap())),
        Err(Error::NameConflict(_))
    ));
    assert!(registry.find_file_by_path("comments/deprecated.proto").is_none());
    assert!(registry.find_descriptor_by_name("goproto.protoc.comments.DeprecatedEnum").is_none());
    let found = registry
        .find_descriptor_by_name("goproto.protoc.comments.DeprecatedMessage")
        .unwrap();
    assert!(found.ptr_eq(&protolens::descriptor::DescriptorRef::Message(legacy)));
}

#[test]
fn nested_legacy_types() {
    let registry = Registry::new();
    let person = registry.register_legacy_message::<Person>().unwrap();
    assert_eq!(person.syntax, Syntax::Proto2);

    let phones = person.field_by_name("phones").unwrap();
    let phone = phones.message_type().unwrap();
    assert_eq!(phone.full_name(), "book.Person.Phone");
    assert_eq!(phone.runtime_type(), Some(TypeHandle::of::<PersonPhone>()));

    let kind = phone.field_by_name("type").unwrap();
    let phone_type = kind.enum_type().unwrap();
    assert_eq!(phone_type.full_name(), "book.Person.PhoneType");
    let numbers: Vec<_> = phone_type.values.iter().map(|value| value.number).collect();
    assert_eq!(numbers, vec![0, 1, 2]);
    assert_eq!(
        kind.default_value,
        Some(protolens::descriptor::DefaultValue::Enum("HOME".into()))
    );

    let notes = person.field_by_name("notes").unwrap();
    assert!(notes.is_map());
    let entry = notes.message_type().unwrap();
    assert_eq!(entry.name(), "NotesEntry");
    let names: Vec<_> = entry.fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, vec!["key", "value"]);

    let manager = person.field_by_name("manager").unwrap().message_type().unwrap();
    assert!(std::sync::Arc::ptr_eq(&manager, &person));

    let contact = person.oneof_by_name("contact").unwrap();
    let members: Vec<_> = contact.fields().iter().map(|field| field.number).collect();
    assert_eq!(members, vec![7, 8]);
}

fn call_file() -> FileDescriptorProto {
    let value = |name: &str, number: i32| EnumValueDescriptorProto {
        name: Some(name.into()),
        number: Some(number),
        options: None,
    };
    FileDescriptorProto {
        name: Some("call.proto".into()),
        package: Some("p".into()),
        message_type: vec![DescriptorProto {
            name: Some("Call".into()),
            field: vec![FieldDescriptorProto {
                name: Some("kind".into()),
                number: Some(1),
                label: Some(FieldLabel::Optional),
                r#type: Some(FieldType::Enum),
                type_name: Some(".p.Call.Kind".into()),
                json_name: Some("kind".into()),
                default_value: Some("HOME".into()),
                ..Default::default()
            }],
            enum_type: vec![EnumDescriptorProto {
                name: Some("Kind".into()),
                value: vec![value("MOBILE", 0), value("HOME", 1)],
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[test]
fn numeric_enum_default_matches_decoded() {
    let decoded = from_proto(&call_file(), &Vec::<FileRc>::new()).unwrap();
    let decoded = &decoded.messages[0];

    let legacy = Registry::new().register_legacy_message::<Call>().unwrap();
    assert_eq!(legacy.full_name(), decoded.full_name());
    assert_same_field(&legacy.fields[0], &decoded.fields[0]);
    assert_eq!(
        legacy.fields[0].default_value,
        Some(protolens::descriptor::DefaultValue::Enum("HOME".into()))
    );
}

#[test]
fn enum_default_outside_the_enum_is_rejected() {
    let err = Registry::new()
        .register_legacy_message::<BadDefault>()
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedLegacyShape(_)));
}

#[test]
fn unparsable_metadata_fails_permanently() {
    let registry = Registry::new();
    let first = registry.register_legacy_message::<Unparsable>().unwrap_err();
    assert!(matches!(first, Error::UnsupportedLegacyShape(_)));
    let second = registry.register_legacy_message::<Unparsable>().unwrap_err();
    assert_eq!(first, second);
    assert_eq!(registry.legacy().inferred_count(), 1);
}
