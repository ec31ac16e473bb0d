//! Construction of descriptor nodes from schema messages.
//!
//! Every path that produces a descriptor tree (the lazy file builder, the proto converter
//! and the legacy engine) goes through these functions, so names, JSON names, flags and
//! defaults are derived identically. Construction builds the nodes and their parent links;
//! type references are left unresolved and are bound afterwards through the
//! [`ReferenceSlot`]s of the file, using whichever strategy the caller implements.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, OnceLock},
};

use crate::{
    descriptor::{
        Cardinality, DefaultValue, DescriptorRef, EnumDescriptor, EnumRc, EnumValueDescriptor,
        ExtensionRangeInfo, FieldDescriptor, FieldFlags, FieldRc, FileDescriptor, FileRc, Kind,
        MessageDescriptor, MessageRc, MethodDescriptor, MethodRc, OneofDescriptor,
        ServiceDescriptor, ServiceRc, Syntax, TypeRef,
    },
    proto::{
        enum_options, enum_value_options, field_options, file_options, message_options,
        method_options, option_flag, service_options, DescriptorProto, EnumDescriptorProto,
        FieldDescriptorProto, FileDescriptorProto, ServiceDescriptorProto,
    },
    utils::names::{join_name, json_camel_case},
    validation::ValidationConfig,
    Error, Result,
};

/// Default bound on message nesting.
pub(crate) const MAX_NESTING_DEPTH: usize = 64;

/// Build the node tree of a file, without resolving type references.
///
/// # Arguments
/// * `proto` - The decoded file
/// * `raw` - Canonical bytes of `proto`, kept on the file
/// * `config` - Bounds applied while building
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for missing names, numbers or types and unparsable
/// defaults, [`crate::Error::SemanticViolation`] for duplicate names or field numbers, and
/// [`crate::Error::RecursionLimit`] for excessive nesting.
pub(crate) fn build_file(
    proto: &FileDescriptorProto,
    raw: Vec<u8>,
    config: &ValidationConfig,
) -> Result<FileRc> {
    let syntax = Syntax::from_field(proto.syntax.as_deref())?;
    let package = proto.package().to_string();

    let dependency_index = |index: &i32| -> Result<usize> {
        usize::try_from(*index)
            .ok()
            .filter(|&index| index < proto.dependency.len())
            .ok_or_else(|| malformed_error!("Import index {} out of range", index))
    };
    let public_dependencies = proto
        .public_dependency
        .iter()
        .map(dependency_index)
        .collect::<Result<Vec<_>>>()?;
    let weak_dependencies = proto
        .weak_dependency
        .iter()
        .map(dependency_index)
        .collect::<Result<Vec<_>>>()?;

    let messages = proto
        .message_type
        .iter()
        .enumerate()
        .map(|(index, message)| build_message(message, &package, index, syntax, 1, config))
        .collect::<Result<Vec<_>>>()?;
    let enums = proto
        .enum_type
        .iter()
        .enumerate()
        .map(|(index, enumeration)| build_enum(enumeration, &package, index, syntax))
        .collect::<Result<Vec<_>>>()?;
    let extensions = proto
        .extension
        .iter()
        .enumerate()
        .map(|(index, extension)| build_field(extension, &package, index, syntax, true, 0))
        .collect::<Result<Vec<_>>>()?;
    let services = proto
        .service
        .iter()
        .enumerate()
        .map(|(index, service)| build_service(service, &package, index, syntax))
        .collect::<Result<Vec<_>>>()?;

    let mut all_enums = enums.clone();
    let mut all_messages = Vec::new();
    let mut all_extensions = extensions.clone();
    for message in &messages {
        collect_pre_order(message, &mut all_messages, &mut all_enums, &mut all_extensions);
    }

    let mut declarations = Declarations::default();
    for message in &all_messages {
        declarations.insert_message(message)?;
    }
    for enumeration in &all_enums {
        declarations.insert_enum(enumeration)?;
    }
    for extension in &all_extensions {
        declarations.insert(&extension.full_name, DescriptorRef::Field(extension.clone()))?;
    }
    for service in &services {
        declarations.insert(&service.full_name, DescriptorRef::Service(service.clone()))?;
        for method in &service.methods {
            declarations.insert(&method.full_name, DescriptorRef::Method(method.clone()))?;
        }
    }

    let file = Arc::new(FileDescriptor {
        path: proto.name().to_string(),
        package,
        syntax,
        dependencies: proto.dependency.clone(),
        public_dependencies,
        weak_dependencies,
        messages,
        enums,
        extensions,
        services,
        deprecated: option_flag(proto.options.as_ref(), file_options::DEPRECATED)?,
        options: proto.options.clone(),
        raw,
        declarations: declarations.0,
        all_enums,
        all_messages,
        all_extensions,
    });
    file.adopt_children();

    Ok(file)
}

fn collect_pre_order(
    message: &MessageRc,
    messages: &mut Vec<MessageRc>,
    enums: &mut Vec<EnumRc>,
    extensions: &mut Vec<FieldRc>,
) {
    messages.push(message.clone());
    enums.extend(message.enums.iter().cloned());
    extensions.extend(message.extensions.iter().cloned());
    for nested in &message.messages {
        collect_pre_order(nested, messages, enums, extensions);
    }
}

#[derive(Default)]
struct Declarations(HashMap<String, DescriptorRef>);

impl Declarations {
    fn insert(&mut self, full_name: &str, node: DescriptorRef) -> Result<()> {
        match self.0.entry(full_name.to_string()) {
            Entry::Occupied(_) => Err(semantic_error!("Duplicate declaration of {}", full_name)),
            Entry::Vacant(slot) => {
                slot.insert(node);
                Ok(())
            }
        }
    }

    fn insert_message(&mut self, message: &MessageRc) -> Result<()> {
        self.insert(&message.full_name, DescriptorRef::Message(message.clone()))?;
        for field in &message.fields {
            self.insert(&field.full_name, DescriptorRef::Field(field.clone()))?;
        }
        for oneof in &message.oneofs {
            self.insert(&oneof.full_name, DescriptorRef::Oneof(oneof.clone()))?;
        }
        Ok(())
    }

    fn insert_enum(&mut self, enumeration: &EnumRc) -> Result<()> {
        self.insert(&enumeration.full_name, DescriptorRef::Enum(enumeration.clone()))?;
        for value in &enumeration.values {
            self.insert(&value.full_name, DescriptorRef::EnumValue(value.clone()))?;
        }
        Ok(())
    }
}

/// Build a message and everything nested in it.
///
/// `depth` is the nesting level of the message itself, starting at 1 for top-level
/// messages.
pub(crate) fn build_message(
    proto: &DescriptorProto,
    scope: &str,
    index: usize,
    syntax: Syntax,
    depth: usize,
    config: &ValidationConfig,
) -> Result<MessageRc> {
    if depth > config.max_nesting_depth {
        return Err(Error::RecursionLimit(config.max_nesting_depth));
    }

    let name = required_name(proto.name.as_deref(), "message", scope)?;
    let full_name = join_name(scope, name);

    let fields = proto
        .field
        .iter()
        .enumerate()
        .map(|(index, field)| {
            build_field(field, &full_name, index, syntax, false, proto.oneof_decl.len())
        })
        .collect::<Result<Vec<_>>>()?;
    let extensions = proto
        .extension
        .iter()
        .enumerate()
        .map(|(index, extension)| build_field(extension, &full_name, index, syntax, true, 0))
        .collect::<Result<Vec<_>>>()?;

    let oneofs = proto
        .oneof_decl
        .iter()
        .enumerate()
        .map(|(index, oneof)| {
            let name = required_name(oneof.name.as_deref(), "oneof", &full_name)?;
            Ok(Arc::new(OneofDescriptor {
                full_name: join_name(&full_name, name),
                name: name.to_string(),
                index,
                syntax,
                parent: OnceLock::new(),
                field_indices: fields
                    .iter()
                    .filter(|field| field.oneof_index == Some(index))
                    .map(|field| field.index)
                    .collect(),
                options: oneof.options.clone(),
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    let messages = proto
        .nested_type
        .iter()
        .enumerate()
        .map(|(index, nested)| build_message(nested, &full_name, index, syntax, depth + 1, config))
        .collect::<Result<Vec<_>>>()?;
    let enums = proto
        .enum_type
        .iter()
        .enumerate()
        .map(|(index, enumeration)| build_enum(enumeration, &full_name, index, syntax))
        .collect::<Result<Vec<_>>>()?;

    let mut by_name = HashMap::with_capacity(fields.len());
    let mut by_number = HashMap::with_capacity(fields.len());
    let mut by_json_name = HashMap::with_capacity(fields.len());
    for field in &fields {
        if by_name.insert(field.name.clone(), field.index).is_some() {
            return Err(semantic_error!("Duplicate field name {}", field.full_name));
        }
        if let Some(previous) = by_number.insert(field.number, field.index) {
            return Err(semantic_error!(
                "Field number {} of {} is used by both {} and {}",
                field.number,
                full_name,
                fields[previous].name,
                field.name
            ));
        }
        by_json_name
            .entry(field.json_name.clone())
            .or_insert(field.index);
    }

    let message = Arc::new(MessageDescriptor {
        full_name,
        name: name.to_string(),
        index,
        syntax,
        parent: OnceLock::new(),
        fields,
        oneofs,
        messages,
        enums,
        extensions,
        reserved_ranges: proto
            .reserved_range
            .iter()
            .map(|range| range.start.unwrap_or_default()..range.end.unwrap_or_default())
            .collect(),
        reserved_names: proto.reserved_name.clone(),
        extension_ranges: proto
            .extension_range
            .iter()
            .map(|range| ExtensionRangeInfo {
                range: range.start.unwrap_or_default()..range.end.unwrap_or_default(),
                options: range.options.clone(),
            })
            .collect(),
        is_map_entry: option_flag(proto.options.as_ref(), message_options::MAP_ENTRY)?,
        deprecated: option_flag(proto.options.as_ref(), message_options::DEPRECATED)?,
        options: proto.options.clone(),
        by_name,
        by_number,
        by_json_name,
        runtime_type: OnceLock::new(),
    });
    message.adopt_children();

    Ok(message)
}

fn build_field(
    proto: &FieldDescriptorProto,
    scope: &str,
    index: usize,
    syntax: Syntax,
    is_extension: bool,
    oneof_count: usize,
) -> Result<FieldRc> {
    let name = required_name(proto.name.as_deref(), "field", scope)?;
    let full_name = join_name(scope, name);
    let number = proto
        .number
        .ok_or_else(|| malformed_error!("Field {} has no number", full_name))?;
    let kind = Kind::from(
        proto
            .r#type
            .ok_or_else(|| malformed_error!("Field {} has no type", full_name))?,
    );

    let mut flags = FieldFlags::empty();
    flags.set(FieldFlags::EXTENSION, is_extension);
    flags.set(FieldFlags::HAS_JSON_NAME, proto.json_name.is_some());
    flags.set(
        FieldFlags::PROTO3_OPTIONAL,
        proto.proto3_optional.unwrap_or(false),
    );
    if let Some(options) = &proto.options {
        if let Some(packed) = options.get_bool(field_options::PACKED)? {
            flags.insert(FieldFlags::PACKED_EXPLICIT);
            flags.set(FieldFlags::PACKED, packed);
        }
        flags.set(FieldFlags::WEAK, options.flag(field_options::WEAK)?);
        flags.set(FieldFlags::LAZY, options.flag(field_options::LAZY)?);
        flags.set(FieldFlags::DEPRECATED, options.flag(field_options::DEPRECATED)?);
    }

    let oneof_index = match proto.oneof_index {
        None => None,
        Some(_) if is_extension => {
            return Err(semantic_error!("Extension {} cannot be part of a oneof", full_name))
        }
        Some(raw) => Some(
            usize::try_from(raw)
                .ok()
                .filter(|&index| index < oneof_count)
                .ok_or_else(|| {
                    semantic_error!("Field {} has invalid oneof index {}", full_name, raw)
                })?,
        ),
    };

    let default_value = proto
        .default_value
        .as_deref()
        .map(|text| DefaultValue::parse(kind, text))
        .transpose()?;

    Ok(Arc::new(FieldDescriptor {
        json_name: proto
            .json_name
            .clone()
            .unwrap_or_else(|| json_camel_case(name)),
        full_name,
        name: name.to_string(),
        index,
        syntax,
        parent: OnceLock::new(),
        number,
        kind,
        cardinality: Cardinality::from(proto.label()),
        default_text: proto.default_value.clone(),
        default_value,
        oneof_index,
        flags,
        type_name: proto.type_name.clone(),
        extendee_name: proto.extendee.clone(),
        options: proto.options.clone(),
        type_ref: OnceLock::new(),
        extendee: OnceLock::new(),
    }))
}

/// Build an enum and its values.
///
/// `scope` is the scope the enum is declared in; values are placed in the same scope.
pub(crate) fn build_enum(
    proto: &EnumDescriptorProto,
    scope: &str,
    index: usize,
    syntax: Syntax,
) -> Result<EnumRc> {
    let name = required_name(proto.name.as_deref(), "enum", scope)?;
    let full_name = join_name(scope, name);

    let values = proto
        .value
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let value_name = required_name(value.name.as_deref(), "enum value", &full_name)?;
            Ok(Arc::new(EnumValueDescriptor {
                full_name: join_name(scope, value_name),
                name: value_name.to_string(),
                index,
                syntax,
                parent: OnceLock::new(),
                number: value.number.unwrap_or_default(),
                deprecated: option_flag(value.options.as_ref(), enum_value_options::DEPRECATED)?,
                options: value.options.clone(),
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut by_name = HashMap::with_capacity(values.len());
    let mut by_number = HashMap::with_capacity(values.len());
    for value in &values {
        if by_name.insert(value.name.clone(), value.index).is_some() {
            return Err(semantic_error!("Duplicate enum value {}", value.full_name));
        }
        by_number.entry(value.number).or_insert(value.index);
    }

    let enumeration = Arc::new(EnumDescriptor {
        full_name,
        name: name.to_string(),
        index,
        syntax,
        parent: OnceLock::new(),
        values,
        reserved_ranges: proto
            .reserved_range
            .iter()
            .map(|range| range.start.unwrap_or_default()..=range.end.unwrap_or_default())
            .collect(),
        reserved_names: proto.reserved_name.clone(),
        allow_alias: option_flag(proto.options.as_ref(), enum_options::ALLOW_ALIAS)?,
        deprecated: option_flag(proto.options.as_ref(), enum_options::DEPRECATED)?,
        options: proto.options.clone(),
        by_name,
        by_number,
        runtime_type: OnceLock::new(),
    });
    enumeration.adopt_children();

    Ok(enumeration)
}

fn build_service(
    proto: &ServiceDescriptorProto,
    scope: &str,
    index: usize,
    syntax: Syntax,
) -> Result<ServiceRc> {
    let name = required_name(proto.name.as_deref(), "service", scope)?;
    let full_name = join_name(scope, name);

    let methods = proto
        .method
        .iter()
        .enumerate()
        .map(|(index, method)| {
            let method_name = required_name(method.name.as_deref(), "method", &full_name)?;
            Ok(Arc::new(MethodDescriptor {
                full_name: join_name(&full_name, method_name),
                name: method_name.to_string(),
                index,
                syntax,
                parent: OnceLock::new(),
                input_name: method.input_type.clone().unwrap_or_default(),
                output_name: method.output_type.clone().unwrap_or_default(),
                client_streaming: method.client_streaming.unwrap_or(false),
                server_streaming: method.server_streaming.unwrap_or(false),
                deprecated: option_flag(method.options.as_ref(), method_options::DEPRECATED)?,
                options: method.options.clone(),
                input: OnceLock::new(),
                output: OnceLock::new(),
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    let service = Arc::new(ServiceDescriptor {
        full_name,
        name: name.to_string(),
        index,
        syntax,
        parent: OnceLock::new(),
        methods,
        deprecated: option_flag(proto.options.as_ref(), service_options::DEPRECATED)?,
        options: proto.options.clone(),
    });
    service.adopt_children();

    Ok(service)
}

fn required_name<'a>(name: Option<&'a str>, what: &str, scope: &str) -> Result<&'a str> {
    match name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(malformed_error!("Unnamed {} in scope '{}'", what, scope)),
    }
}

/// What a [`ReferenceSlot`] expects to be bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SlotKind {
    /// The message or enum type of a field or extension
    FieldType,
    /// The message extended by an extension
    Extendee,
    /// The input message of a method
    MethodInput,
    /// The output message of a method
    MethodOutput,
}

/// One unresolved type reference of a file.
#[derive(Clone, Debug)]
pub(crate) enum ReferenceSlot {
    /// A field (or extension) of message, group or enum kind
    FieldType(FieldRc),
    /// An extension's extended message
    Extendee(FieldRc),
    /// A method's input message
    MethodInput(MethodRc),
    /// A method's output message
    MethodOutput(MethodRc),
}

impl ReferenceSlot {
    /// All reference slots of a file, in dependency-index order: typed fields of every
    /// message in pre-order, then per extension its extendee and (if typed) its type, then
    /// input and output of every method.
    pub(crate) fn collect(file: &FileDescriptor) -> Vec<ReferenceSlot> {
        let mut slots = Vec::new();
        for message in &file.all_messages {
            for field in &message.fields {
                if field.kind.is_reference() {
                    slots.push(ReferenceSlot::FieldType(field.clone()));
                }
            }
        }
        for extension in &file.all_extensions {
            slots.push(ReferenceSlot::Extendee(extension.clone()));
            if extension.kind.is_reference() {
                slots.push(ReferenceSlot::FieldType(extension.clone()));
            }
        }
        for service in &file.services {
            for method in &service.methods {
                slots.push(ReferenceSlot::MethodInput(method.clone()));
                slots.push(ReferenceSlot::MethodOutput(method.clone()));
            }
        }
        slots
    }

    /// All reference slots of a standalone message tree, in pre-order.
    pub(crate) fn collect_message(message: &MessageRc) -> Vec<ReferenceSlot> {
        let mut messages = Vec::new();
        let mut enums = Vec::new();
        let mut extensions = Vec::new();
        collect_pre_order(message, &mut messages, &mut enums, &mut extensions);

        let mut slots = Vec::new();
        for message in &messages {
            for field in &message.fields {
                if field.kind.is_reference() {
                    slots.push(ReferenceSlot::FieldType(field.clone()));
                }
            }
        }
        slots
    }

    pub(crate) fn kind(&self) -> SlotKind {
        match self {
            ReferenceSlot::FieldType(_) => SlotKind::FieldType,
            ReferenceSlot::Extendee(_) => SlotKind::Extendee,
            ReferenceSlot::MethodInput(_) => SlotKind::MethodInput,
            ReferenceSlot::MethodOutput(_) => SlotKind::MethodOutput,
        }
    }

    /// Full name of the declaration holding the reference.
    pub(crate) fn owner(&self) -> &str {
        match self {
            ReferenceSlot::FieldType(field) | ReferenceSlot::Extendee(field) => &field.full_name,
            ReferenceSlot::MethodInput(method) | ReferenceSlot::MethodOutput(method) => {
                &method.full_name
            }
        }
    }

    /// The scope relative names are resolved from.
    pub(crate) fn scope(&self) -> &str {
        let owner = self.owner();
        owner.rsplit_once('.').map_or("", |(scope, _)| scope)
    }

    /// The referenced name as stored in the schema.
    pub(crate) fn stored_name(&self) -> Option<&str> {
        match self {
            ReferenceSlot::FieldType(field) => field.type_name.as_deref(),
            ReferenceSlot::Extendee(field) => field.extendee_name.as_deref(),
            ReferenceSlot::MethodInput(method) => Some(method.input_name.as_str()),
            ReferenceSlot::MethodOutput(method) => Some(method.output_name.as_str()),
        }
        .filter(|name| !name.is_empty())
    }

    /// Returns `true` if the slot must be bound to a message (rather than an enum).
    pub(crate) fn expects_message(&self) -> bool {
        match self {
            ReferenceSlot::FieldType(field) => field.kind.is_message(),
            _ => true,
        }
    }

    /// Bind the slot to a resolved declaration.
    ///
    /// # Errors
    /// Returns [`crate::Error::SemanticViolation`] if the target is of the wrong kind or the
    /// slot is already bound to a different declaration.
    pub(crate) fn bind(&self, target: &DescriptorRef) -> Result<()> {
        let reference = match (target, self.expects_message()) {
            (DescriptorRef::Message(message), true) => TypeRef::message(message),
            (DescriptorRef::Enum(enumeration), false) => TypeRef::enumeration(enumeration),
            (other, expects_message) => {
                return Err(semantic_error!(
                    "{} expects {} but {} is not one",
                    self.owner(),
                    if expects_message { "a message" } else { "an enum" },
                    crate::descriptor::Descriptor::full_name(other)
                ))
            }
        };

        let cell = match self {
            ReferenceSlot::FieldType(field) => &field.type_ref,
            ReferenceSlot::Extendee(field) => &field.extendee,
            ReferenceSlot::MethodInput(method) => &method.input,
            ReferenceSlot::MethodOutput(method) => &method.output,
        };

        let bound = cell.get_or_init(|| reference.clone());
        if bound.full_name() == reference.full_name() {
            Ok(())
        } else {
            Err(semantic_error!(
                "{} is already bound to {}, cannot rebind to {}",
                self.owner(),
                bound.full_name(),
                reference.full_name()
            ))
        }
    }
}
