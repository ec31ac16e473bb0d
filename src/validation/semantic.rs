//! Semantic validation for linked descriptor trees
//!
//! Each check appends human-readable violations to a list; a file fails validation with a
//! single [`crate::Error::SemanticViolation`] that lists all of them.

use std::{collections::HashMap, ops::Range};

use rayon::prelude::*;

use crate::{
    descriptor::{Cardinality, EnumRc, FieldRc, FileDescriptor, Kind, MessageRc, Syntax},
    validation::ValidationConfig,
    wire::MAX_FIELD_NUMBER,
    Result,
};

/// First field number of the block reserved for the protocol-buffer implementation.
pub const FIRST_RESERVED_NUMBER: i32 = 19000;
/// Last field number of the block reserved for the protocol-buffer implementation.
pub const LAST_RESERVED_NUMBER: i32 = 19999;

#[allow(clippy::cast_possible_wrap)]
const MAX_NUMBER: i32 = MAX_FIELD_NUMBER as i32;

/// Run every check enabled in `config` over a linked file.
///
/// # Errors
/// Returns [`crate::Error::SemanticViolation`] listing all violations found.
pub fn validate_file(file: &FileDescriptor, config: &ValidationConfig) -> Result<()> {
    if !config.any_semantic_check() {
        return Ok(());
    }

    let mut errors: Vec<String> = file
        .all_messages()
        .par_iter()
        .flat_map(|message| {
            let mut errors = Vec::new();
            SemanticValidator::validate_message(message, config, &mut errors);
            errors
        })
        .collect();

    for enumeration in file.all_enums() {
        SemanticValidator::validate_enum(enumeration, config, &mut errors);
    }
    for extension in file.all_extensions() {
        SemanticValidator::validate_extension(extension, config, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(semantic_error!("{}: {}", file.path, errors.join("; ")))
    }
}

struct SemanticValidator;

impl SemanticValidator {
    fn validate_message(message: &MessageRc, config: &ValidationConfig, errors: &mut Vec<String>) {
        for field in &message.fields {
            if config.enable_number_checks {
                Self::validate_number(field, errors);
            }
            if config.enable_reserved_checks {
                if message.is_reserved_number(field.number) {
                    errors.push(format!(
                        "Field {} uses reserved number {}",
                        field.full_name, field.number
                    ));
                }
                if message.is_reserved_name(&field.name) {
                    errors.push(format!("Field {} uses a reserved name", field.full_name));
                }
            }
            if config.enable_extension_range_checks && message.is_extension_number(field.number) {
                errors.push(format!(
                    "Field {} number {} lies in an extension range",
                    field.full_name, field.number
                ));
            }
            if config.enable_map_entry_checks
                && field.cardinality != Cardinality::Repeated
                && field.message_type().is_some_and(|target| target.is_map_entry)
            {
                errors.push(format!(
                    "Map entry {} used by non-repeated field {}",
                    field.type_ref().map_or("", |target| target.full_name()),
                    field.full_name
                ));
            }
            if config.enable_proto3_checks && message.syntax == Syntax::Proto3 {
                Self::validate_proto3_field(field, errors);
            }
        }

        for oneof in &message.oneofs {
            for field in oneof.fields() {
                if field.cardinality == Cardinality::Repeated {
                    errors.push(format!(
                        "Field {} in oneof {} cannot be repeated",
                        field.full_name, oneof.full_name
                    ));
                }
            }
        }

        if config.enable_extension_range_checks {
            Self::validate_extension_ranges(message, errors);
        }
        if config.enable_reserved_checks {
            Self::validate_ranges(
                &message.full_name,
                "reserved",
                message.reserved_ranges.clone(),
                errors,
            );
        }
        if config.enable_map_entry_checks && message.is_map_entry {
            Self::validate_map_entry(message, errors);
        }
        if config.enable_json_name_checks {
            let mut seen: HashMap<&str, &str> = HashMap::new();
            for field in &message.fields {
                if let Some(previous) = seen.insert(&field.json_name, &field.name) {
                    errors.push(format!(
                        "Fields {} and {} of {} share the JSON name {}",
                        previous, field.name, message.full_name, field.json_name
                    ));
                }
            }
        }
    }

    fn validate_number(field: &FieldRc, errors: &mut Vec<String>) {
        if !(1..=MAX_NUMBER).contains(&field.number) {
            errors.push(format!(
                "Field {} number {} out of range",
                field.full_name, field.number
            ));
        } else if (FIRST_RESERVED_NUMBER..=LAST_RESERVED_NUMBER).contains(&field.number) {
            errors.push(format!(
                "Field {} number {} lies in the implementation-reserved range",
                field.full_name, field.number
            ));
        }
    }

    fn validate_proto3_field(field: &FieldRc, errors: &mut Vec<String>) {
        if field.cardinality == Cardinality::Required {
            errors.push(format!("Required field {} in proto3", field.full_name));
        }
        if field.default_text.is_some() {
            errors.push(format!("Explicit default on {} in proto3", field.full_name));
        }
        if field.kind == Kind::Group {
            errors.push(format!("Group field {} in proto3", field.full_name));
        }
    }

    fn validate_extension_ranges(message: &MessageRc, errors: &mut Vec<String>) {
        let ranges: Vec<Range<i32>> = message
            .extension_ranges
            .iter()
            .map(|info| info.range.clone())
            .collect();
        for range in &ranges {
            if range.start < 1 || range.end > MAX_NUMBER + 1 {
                errors.push(format!(
                    "Extension range {}..{} of {} out of bounds",
                    range.start, range.end, message.full_name
                ));
            }
            if message
                .reserved_ranges
                .iter()
                .any(|reserved| reserved.start < range.end && range.start < reserved.end)
            {
                errors.push(format!(
                    "Extension range {}..{} of {} overlaps a reserved range",
                    range.start, range.end, message.full_name
                ));
            }
        }
        Self::validate_ranges(&message.full_name, "extension", ranges, errors);
    }

    fn validate_ranges(owner: &str, what: &str, mut ranges: Vec<Range<i32>>, errors: &mut Vec<String>) {
        ranges.sort_by_key(|range| range.start);
        for range in &ranges {
            if range.start >= range.end {
                errors.push(format!(
                    "Empty {} range {}..{} in {}",
                    what, range.start, range.end, owner
                ));
            }
        }
        for pair in ranges.windows(2) {
            if pair[1].start < pair[0].end {
                errors.push(format!(
                    "Overlapping {} ranges {}..{} and {}..{} in {}",
                    what, pair[0].start, pair[0].end, pair[1].start, pair[1].end, owner
                ));
            }
        }
    }

    fn validate_map_entry(message: &MessageRc, errors: &mut Vec<String>) {
        let shaped = message.fields.len() == 2
            && message
                .map_key()
                .is_some_and(|key| key.name == "key" && key.cardinality == Cardinality::Optional)
            && message
                .map_value()
                .is_some_and(|value| value.name == "value" && value.cardinality == Cardinality::Optional);
        if !shaped {
            errors.push(format!(
                "Map entry {} must have exactly the fields key = 1 and value = 2",
                message.full_name
            ));
            return;
        }
        if let Some(key) = message.map_key() {
            if !key.kind.is_valid_map_key() {
                errors.push(format!(
                    "Map entry {} has invalid key type {}",
                    message.full_name, key.kind
                ));
            }
        }
        if !message.name.ends_with("Entry")
            || !message.messages.is_empty()
            || !message.enums.is_empty()
            || !message.oneofs.is_empty()
            || !message.extension_ranges.is_empty()
        {
            errors.push(format!("Map entry {} has an invalid shape", message.full_name));
        }
    }

    fn validate_enum(enumeration: &EnumRc, config: &ValidationConfig, errors: &mut Vec<String>) {
        if config.enable_enum_checks {
            if enumeration.values.is_empty() {
                errors.push(format!("Enum {} has no values", enumeration.full_name));
            }
            if !enumeration.allow_alias {
                for value in &enumeration.values {
                    if let Some(first) = enumeration.value_by_number(value.number) {
                        if first.index != value.index {
                            errors.push(format!(
                                "Enum values {} and {} share number {} without allow_alias",
                                first.name, value.name, value.number
                            ));
                        }
                    }
                }
            }
        }
        if config.enable_reserved_checks {
            for value in &enumeration.values {
                if enumeration.is_reserved_number(value.number) {
                    errors.push(format!(
                        "Enum value {} uses reserved number {}",
                        value.full_name, value.number
                    ));
                }
                if enumeration.is_reserved_name(&value.name) {
                    errors.push(format!("Enum value {} uses a reserved name", value.full_name));
                }
            }
        }
        if config.enable_proto3_checks
            && enumeration.syntax == Syntax::Proto3
            && enumeration.values.first().is_some_and(|value| value.number != 0)
        {
            errors.push(format!(
                "First value of proto3 enum {} must be zero",
                enumeration.full_name
            ));
        }
    }

    fn validate_extension(extension: &FieldRc, config: &ValidationConfig, errors: &mut Vec<String>) {
        if config.enable_number_checks {
            Self::validate_number(extension, errors);
        }
        if config.enable_proto3_checks && extension.syntax == Syntax::Proto3 {
            Self::validate_proto3_field(extension, errors);
        }
        if config.enable_extension_range_checks {
            if let Some(extendee) = extension.extendee().and_then(|target| target.upgrade_message()) {
                if !extendee.is_extension_number(extension.number) {
                    errors.push(format!(
                        "Extension {} number {} is not in an extension range of {}",
                        extension.full_name, extension.number, extendee.full_name
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptor::{build_file, ReferenceSlot},
        proto::{
            enum_options, DescriptorProto, ExtensionRange, FieldDescriptorProto, FieldLabel,
            FieldType, FileDescriptorProto, RawOptions, ReservedRange, SchemaMessage,
        },
        test::{enumeration, message, nested_file, scalar},
        Error,
    };

    fn link_locally(file: &FileDescriptor) {
        for slot in ReferenceSlot::collect(file) {
            if let Some(target) = slot
                .stored_name()
                .and_then(|name| file.find_by_name(name.trim_start_matches('.')))
            {
                slot.bind(&target).unwrap();
            }
        }
    }

    fn check(proto: FileDescriptorProto, config: &ValidationConfig) -> Result<()> {
        let file = build_file(&proto, proto.encode_to_vec(), config)?;
        link_locally(&file);
        validate_file(&file, config)
    }

    fn single(message: DescriptorProto) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("check.proto".into()),
            package: Some("check".into()),
            message_type: vec![message],
            ..Default::default()
        }
    }

    #[test]
    fn nested_fixture_is_valid() {
        check(nested_file(), &ValidationConfig::strict()).unwrap();
    }

    #[test]
    fn implementation_reserved_numbers() {
        let proto = single(message("M", vec![scalar("a", 19500, FieldType::Int32)]));
        assert!(matches!(
            check(proto.clone(), &ValidationConfig::default()),
            Err(Error::SemanticViolation(_))
        ));
        assert!(check(proto, &ValidationConfig::minimal()).is_ok());

        let proto = single(message("M", vec![scalar("a", 0, FieldType::Int32)]));
        assert!(check(proto, &ValidationConfig::default()).is_err());
    }

    #[test]
    fn declared_reservations() {
        let reserved = DescriptorProto {
            reserved_range: vec![ReservedRange {
                start: Some(5),
                end: Some(10),
            }],
            reserved_name: vec!["gone".into()],
            ..message("M", vec![scalar("a", 7, FieldType::Int32)])
        };
        let err = check(single(reserved.clone()), &ValidationConfig::default()).unwrap_err();
        assert!(err.to_string().contains("reserved number 7"));

        let by_name = DescriptorProto {
            field: vec![scalar("gone", 1, FieldType::Int32)],
            ..reserved
        };
        assert!(check(single(by_name), &ValidationConfig::default()).is_err());
    }

    #[test]
    fn extension_ranges() {
        let overlapping = DescriptorProto {
            extension_range: vec![
                ExtensionRange {
                    start: Some(100),
                    end: Some(200),
                    options: None,
                },
                ExtensionRange {
                    start: Some(150),
                    end: Some(250),
                    options: None,
                },
            ],
            ..message("M", vec![scalar("a", 1, FieldType::Int32)])
        };
        let err = check(single(overlapping), &ValidationConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Overlapping extension ranges"));

        let mut proto = nested_file();
        proto.extension[0].number = Some(300);
        let err = check(proto, &ValidationConfig::default()).unwrap_err();
        assert!(err.to_string().contains("not in an extension range"));

        let mut proto = nested_file();
        proto.message_type[0].field[0].number = Some(150);
        assert!(check(proto, &ValidationConfig::default()).is_err());
    }

    #[test]
    fn proto3_rules() {
        let mut required = scalar("a", 1, FieldType::Int32);
        required.label = Some(FieldLabel::Required);
        let mut proto = single(message("M", vec![required]));
        proto.syntax = Some("proto3".into());
        assert!(check(proto.clone(), &ValidationConfig::default()).is_err());
        assert!(check(proto, &ValidationConfig::minimal()).is_ok());

        let mut defaulted = scalar("a", 1, FieldType::Int32);
        defaulted.default_value = Some("5".into());
        let mut proto = single(message("M", vec![defaulted]));
        proto.syntax = Some("proto3".into());
        assert!(check(proto, &ValidationConfig::default()).is_err());

        let mut proto = single(message("M", Vec::new()));
        proto.syntax = Some("proto3".into());
        proto.enum_type = vec![enumeration("E", &[("ONE", 1)])];
        let err = check(proto, &ValidationConfig::default()).unwrap_err();
        assert!(err.to_string().contains("must be zero"));
    }

    #[test]
    fn enum_aliases() {
        let mut proto = single(message("M", Vec::new()));
        proto.enum_type = vec![enumeration("E", &[("A", 0), ("B", 0)])];
        assert!(check(proto.clone(), &ValidationConfig::default()).is_err());

        proto.enum_type[0].options = RawOptions::from_flags(&[(enum_options::ALLOW_ALIAS, true)]);
        assert!(check(proto, &ValidationConfig::default()).is_ok());
    }

    #[test]
    fn json_name_conflicts_only_in_strict() {
        let proto = single(message(
            "M",
            vec![
                scalar("foo_bar", 1, FieldType::Int32),
                scalar("fooBar", 2, FieldType::Int32),
            ],
        ));
        assert!(check(proto.clone(), &ValidationConfig::default()).is_ok());
        assert!(check(proto, &ValidationConfig::strict()).is_err());
    }

    #[test]
    fn map_entry_shape() {
        let mut proto = nested_file();
        proto.message_type[0].nested_type[1].field[1].name = Some("val".into());
        let err = check(proto, &ValidationConfig::default()).unwrap_err();
        assert!(err.to_string().contains("key = 1 and value = 2"));

        let mut proto = nested_file();
        proto.message_type[0].field[3].label = Some(FieldLabel::Optional);
        assert!(check(proto, &ValidationConfig::default()).is_err());

        let mut proto = nested_file();
        proto.message_type[0].nested_type[1].field[0] = FieldDescriptorProto {
            r#type: Some(FieldType::Double),
            ..proto.message_type[0].nested_type[1].field[0].clone()
        };
        assert!(check(proto, &ValidationConfig::default()).is_err());
    }

    #[test]
    fn unlinked_extensions_are_not_range_checked() {
        let mut proto = nested_file();
        proto.extension[0].number = Some(300);
        let file = build_file(&proto, Vec::new(), &ValidationConfig::default()).unwrap();
        validate_file(&file, &ValidationConfig::default()).unwrap();
    }
}
