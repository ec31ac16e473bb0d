//! One inference run: skeletons for every reachable type, then linking.

use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
};

use dashmap::DashMap;
use log::{trace, warn};

use crate::{
    descriptor::{
        build_enum, build_message, Descriptor, DescriptorRef, FieldRc, Kind, MessageRc,
        ReferenceSlot, Syntax, TypeHandle, MAX_NESTING_DEPTH,
    },
    legacy::{
        tag::{FieldTag, TagWire},
        FieldMetadata, LegacyKind, LegacyType, ValueShape,
    },
    proto::{
        enum_options, field_options, message_options, DescriptorProto, EnumDescriptorProto,
        EnumValueDescriptorProto, FieldDescriptorProto, FieldLabel, FieldType,
        OneofDescriptorProto, RawOptions,
    },
    utils::names::{group_field_name, join_name, map_entry_name, strip_leading_dot},
    validation::ValidationConfig,
    Error, Result,
};

enum LinkTarget {
    Legacy(LegacyType),
    Entry(String),
}

struct Link {
    field: String,
    target: LinkTarget,
}

struct Skeleton {
    handle: TypeHandle,
    node: DescriptorRef,
    links: Vec<Link>,
}

pub(crate) struct Session<'a> {
    memo: &'a DashMap<TypeId, Result<DescriptorRef>>,
    skeletons: HashMap<TypeId, Result<Skeleton>>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(memo: &'a DashMap<TypeId, Result<DescriptorRef>>) -> Self {
        Session {
            memo,
            skeletons: HashMap::new(),
        }
    }

    /// Infer `root` and every type it reaches that is not cached yet.
    pub(crate) fn run(mut self, root: LegacyType) -> HashMap<TypeId, Result<DescriptorRef>> {
        let mut queue = vec![root];
        while let Some(ty) = queue.pop() {
            let id = ty.handle().id();
            if self.memo.contains_key(&id) || self.skeletons.contains_key(&id) {
                continue;
            }
            let skeleton = skeleton(ty);
            if let Ok(skeleton) = &skeleton {
                queue.extend(skeleton.links.iter().filter_map(|link| match link.target {
                    LinkTarget::Legacy(target) => Some(target),
                    LinkTarget::Entry(_) => None,
                }));
            }
            self.skeletons.insert(id, skeleton);
        }

        let failed = self.propagate_failures();
        let mut results = HashMap::with_capacity(self.skeletons.len());
        for (id, skeleton) in &self.skeletons {
            let result = match (skeleton, failed.get(id)) {
                (Err(error), _) | (Ok(_), Some(error)) => Err(error.clone()),
                (Ok(skeleton), None) => self.link(skeleton).map(|()| skeleton.node.clone()),
            };
            results.insert(*id, result);
        }
        results
    }

    /// Every type that failed or references a failed type, with the original failure.
    fn propagate_failures(&self) -> HashMap<TypeId, Error> {
        let mut failed: HashMap<TypeId, Error> = self
            .skeletons
            .iter()
            .filter_map(|(id, skeleton)| skeleton.as_ref().err().map(|error| (*id, error.clone())))
            .collect();

        loop {
            let mut newly = Vec::new();
            for (id, skeleton) in &self.skeletons {
                let Ok(skeleton) = skeleton else { continue };
                if failed.contains_key(id) {
                    continue;
                }
                let cause = skeleton.links.iter().find_map(|link| match link.target {
                    LinkTarget::Legacy(target) => {
                        let target = target.handle().id();
                        failed.get(&target).cloned().or_else(|| {
                            self.memo
                                .get(&target)
                                .and_then(|done| done.value().as_ref().err().cloned())
                        })
                    }
                    LinkTarget::Entry(_) => None,
                });
                if let Some(cause) = cause {
                    newly.push((*id, cause));
                }
            }
            if newly.is_empty() {
                return failed;
            }
            failed.extend(newly);
        }
    }

    fn resolve(&self, target: LegacyType) -> Option<DescriptorRef> {
        let id = target.handle().id();
        match self.skeletons.get(&id) {
            Some(Ok(skeleton)) => Some(skeleton.node.clone()),
            Some(Err(_)) => None,
            None => self
                .memo
                .get(&id)
                .and_then(|done| done.value().as_ref().ok().cloned()),
        }
    }

    fn link(&self, skeleton: &Skeleton) -> Result<()> {
        let message = match &skeleton.node {
            DescriptorRef::Message(message) => message,
            DescriptorRef::Enum(enumeration) => {
                return enumeration.bind_runtime_type(skeleton.handle)
            }
            _ => return Ok(()),
        };
        message.bind_runtime_type(skeleton.handle)?;

        for link in &skeleton.links {
            let field = find_field(message, &link.field).ok_or_else(|| {
                Error::UnsupportedLegacyShape(format!("field {} vanished", link.field))
            })?;
            let target = match &link.target {
                LinkTarget::Legacy(target) => self.resolve(*target),
                LinkTarget::Entry(full_name) => {
                    find_message(message, full_name).map(DescriptorRef::Message)
                }
            }
            .ok_or_else(|| {
                Error::UnsupportedLegacyShape(format!("type of {} is not available", link.field))
            })?;

            trace!("{} -> {}", link.field, target.full_name());
            ReferenceSlot::FieldType(field).bind(&target)?;
        }
        Ok(())
    }
}

fn find_field(message: &MessageRc, full_name: &str) -> Option<FieldRc> {
    message
        .fields
        .iter()
        .find(|field| field.full_name == full_name)
        .cloned()
        .or_else(|| {
            message
                .messages
                .iter()
                .find_map(|nested| find_field(nested, full_name))
        })
}

fn find_message(message: &MessageRc, full_name: &str) -> Option<MessageRc> {
    if message.full_name == full_name {
        return Some(message.clone());
    }
    message
        .messages
        .iter()
        .find_map(|nested| find_message(nested, full_name))
}

/// Scope and local name of a legacy type.
fn names(ty: LegacyType) -> Result<(String, String)> {
    names_at(ty, 0)
}

fn names_at(ty: LegacyType, depth: usize) -> Result<(String, String)> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::UnsupportedLegacyShape(format!(
            "enclosing types of {} nest deeper than {}",
            ty.runtime_name(),
            MAX_NESTING_DEPTH
        )));
    }

    let runtime_name = ty.runtime_name();
    if runtime_name.is_empty() {
        return Err(Error::UnsupportedLegacyShape(
            "legacy type without a runtime name".to_string(),
        ));
    }

    match (ty.enclosing)() {
        Some(outer) => {
            let (scope, name) = names_at(outer, depth + 1)?;
            let local = runtime_name
                .strip_prefix(outer.runtime_name())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty())
                .unwrap_or(runtime_name);
            Ok((join_name(&scope, &name), local.to_string()))
        }
        None => Ok((
            (ty.package)().unwrap_or_default().to_string(),
            runtime_name.to_string(),
        )),
    }
}

fn full_name(ty: LegacyType) -> Result<String> {
    let (scope, name) = names(ty)?;
    Ok(join_name(&scope, &name))
}

fn skeleton(ty: LegacyType) -> Result<Skeleton> {
    match ty.kind {
        LegacyKind::Message { fields, oneofs } => message_skeleton(ty, &fields(), &oneofs()),
        LegacyKind::Enum { values } => enum_skeleton(ty, values()),
    }
}

fn enum_skeleton(ty: LegacyType, mut values: Vec<(&'static str, i32)>) -> Result<Skeleton> {
    let (scope, name) = names(ty)?;
    if values.is_empty() {
        return Err(Error::UnsupportedLegacyShape(format!(
            "enum {} has no values",
            ty.runtime_name()
        )));
    }
    values.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let aliased = values.windows(2).any(|pair| pair[0].1 == pair[1].1);
    let proto = EnumDescriptorProto {
        name: Some(name),
        value: values
            .iter()
            .map(|(name, number)| EnumValueDescriptorProto {
                name: Some((*name).to_string()),
                number: Some(*number),
                options: None,
            })
            .collect(),
        options: if aliased {
            RawOptions::from_flags(&[(enum_options::ALLOW_ALIAS, true)])
        } else {
            None
        },
        ..Default::default()
    };

    Ok(Skeleton {
        handle: ty.handle(),
        node: DescriptorRef::Enum(build_enum(&proto, &scope, 0, Syntax::Proto2)?),
        links: Vec::new(),
    })
}

fn message_skeleton(
    ty: LegacyType,
    metadata: &[FieldMetadata],
    oneofs: &[&'static str],
) -> Result<Skeleton> {
    let (scope, name) = names(ty)?;
    let full_name = join_name(&scope, &name);

    let tags = metadata
        .iter()
        .map(|field| FieldTag::parse(field.tag))
        .collect::<Result<Vec<_>>>()?;
    let syntax = if tags.iter().any(|tag| tag.proto3) {
        Syntax::Proto3
    } else {
        Syntax::Proto2
    };

    let mut proto = DescriptorProto {
        name: Some(name),
        oneof_decl: oneofs
            .iter()
            .map(|oneof| OneofDescriptorProto {
                name: Some((*oneof).to_string()),
                options: None,
            })
            .collect(),
        ..Default::default()
    };

    let mut links = Vec::new();
    for (field, tag) in metadata.iter().zip(&tags) {
        let field = FieldBuilder {
            scope: &full_name,
            oneofs,
            nested: &mut proto.nested_type,
            links: &mut links,
        }
        .build(field, tag, None)?;
        proto.field.push(field);
    }

    let message = build_message(&proto, &scope, 0, syntax, 1, &ValidationConfig::default())?;
    Ok(Skeleton {
        handle: ty.handle(),
        node: DescriptorRef::Message(message),
        links,
    })
}

struct FieldBuilder<'a> {
    scope: &'a str,
    oneofs: &'a [&'static str],
    nested: &'a mut Vec<DescriptorProto>,
    links: &'a mut Vec<Link>,
}

impl FieldBuilder<'_> {
    fn build(
        &mut self,
        metadata: &FieldMetadata,
        tag: &FieldTag,
        name_override: Option<&str>,
    ) -> Result<FieldDescriptorProto> {
        let kind = kind_for(tag.wire, &metadata.shape).ok_or_else(|| {
            Error::UnsupportedLegacyShape(format!(
                "{} cannot hold {} values ({})",
                tag.wire,
                shape_name(&metadata.shape),
                metadata.tag
            ))
        })?;

        let name = match (name_override, &tag.name, &metadata.shape) {
            (Some(name), _, _) => name.to_string(),
            (None, Some(name), _) => name.clone(),
            (None, None, ValueShape::Message(target)) if kind == Kind::Group => {
                group_field_name(&names(*target)?.1)
            }
            (None, None, _) => metadata.member.to_string(),
        };
        let field_full_name = join_name(self.scope, &name);

        let mut flags = Vec::new();
        if tag.packed {
            flags.push((field_options::PACKED, true));
        }
        if tag.deprecated {
            flags.push((field_options::DEPRECATED, true));
        }
        if tag.weak.is_some() {
            flags.push((field_options::WEAK, true));
        }

        let mut proto = FieldDescriptorProto {
            name: Some(name.clone()),
            number: Some(tag.number),
            label: Some(tag.label),
            r#type: Some(FieldType::from(kind)),
            json_name: tag.json.clone(),
            default_value: match (&tag.default, &metadata.shape) {
                (Some(default), ValueShape::Enum(target)) => {
                    Some(enum_default(*target, default, &field_full_name)?)
                }
                (default, _) => default.clone(),
            },
            options: RawOptions::from_flags(&flags),
            ..Default::default()
        };

        if let Some(oneof) = metadata.oneof {
            let index = self
                .oneofs
                .iter()
                .position(|name| *name == oneof)
                .ok_or_else(|| {
                    Error::UnsupportedLegacyShape(format!(
                        "field {} names unknown oneof {}",
                        field_full_name, oneof
                    ))
                })?;
            proto.oneof_index = i32::try_from(index).ok();
        }

        match &metadata.shape {
            ValueShape::Enum(target) | ValueShape::Message(target) => {
                let target_name = full_name(*target)?;
                if let Some(declared) = &tag.enum_name {
                    if strip_leading_dot(declared) != target_name {
                        warn!(
                            "{} declares enum {} but its runtime type is named {}",
                            field_full_name, declared, target_name
                        );
                    }
                }
                proto.type_name = Some(format!(".{target_name}"));
                self.links.push(Link {
                    field: field_full_name,
                    target: LinkTarget::Legacy(*target),
                });
            }
            ValueShape::Map { key, value } => {
                let entry_name = map_entry_name(&name);
                let entry_full_name = join_name(self.scope, &entry_name);
                let entry = self.map_entry(&entry_name, &entry_full_name, key, value)?;
                self.nested.push(entry);

                proto.label = Some(FieldLabel::Repeated);
                proto.type_name = Some(format!(".{entry_full_name}"));
                self.links.push(Link {
                    field: field_full_name,
                    target: LinkTarget::Entry(entry_full_name),
                });
            }
            _ => {}
        }

        Ok(proto)
    }

    fn map_entry(
        &mut self,
        entry_name: &str,
        entry_full_name: &str,
        key: &FieldMetadata,
        value: &FieldMetadata,
    ) -> Result<DescriptorProto> {
        let mut nested = Vec::new();
        let mut entry = FieldBuilder {
            scope: entry_full_name,
            oneofs: &[],
            nested: &mut nested,
            links: &mut *self.links,
        };

        let mut fields = Vec::with_capacity(2);
        for (metadata, name, number) in [(key, "key", 1), (value, "value", 2)] {
            let tag = FieldTag::parse(metadata.tag)?;
            let mut field = entry.build(metadata, &tag, Some(name))?;
            field.number = Some(number);
            field.label = Some(FieldLabel::Optional);
            field.oneof_index = None;
            fields.push(field);
        }

        let key_kind = fields[0].r#type.map(Kind::from);
        if !nested.is_empty() || !key_kind.is_some_and(Kind::is_valid_map_key) {
            return Err(Error::UnsupportedLegacyShape(format!(
                "map {} has an invalid key or value",
                entry_full_name
            )));
        }

        Ok(DescriptorProto {
            name: Some(entry_name.to_string()),
            field: fields,
            options: RawOptions::from_flags(&[(message_options::MAP_ENTRY, true)]),
            ..Default::default()
        })
    }
}

/// Older generators write enum defaults as the value number; descriptors carry the name.
fn enum_default(target: LegacyType, default: &str, field: &str) -> Result<String> {
    let (Ok(number), LegacyKind::Enum { values }) = (default.parse::<i32>(), target.kind) else {
        return Ok(default.to_string());
    };
    let mut values = values();
    values.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    values
        .iter()
        .find(|(_, value)| *value == number)
        .map(|(name, _)| (*name).to_string())
        .ok_or_else(|| {
            Error::UnsupportedLegacyShape(format!(
                "default {} of {} is not a value of {}",
                number,
                field,
                target.runtime_name()
            ))
        })
}

fn kind_for(wire: TagWire, shape: &ValueShape) -> Option<Kind> {
    let kind = match (wire, shape) {
        (TagWire::Varint, ValueShape::Bool) => Kind::Bool,
        (TagWire::Varint, ValueShape::I32) => Kind::Int32,
        (TagWire::Varint, ValueShape::I64) => Kind::Int64,
        (TagWire::Varint, ValueShape::U32) => Kind::Uint32,
        (TagWire::Varint, ValueShape::U64) => Kind::Uint64,
        (TagWire::Varint, ValueShape::Enum(target)) if !target.is_message() => Kind::Enum,
        (TagWire::Zigzag32, ValueShape::I32) => Kind::Sint32,
        (TagWire::Zigzag64, ValueShape::I64) => Kind::Sint64,
        (TagWire::Fixed32, ValueShape::U32) => Kind::Fixed32,
        (TagWire::Fixed32, ValueShape::I32) => Kind::Sfixed32,
        (TagWire::Fixed32, ValueShape::F32) => Kind::Float,
        (TagWire::Fixed64, ValueShape::U64) => Kind::Fixed64,
        (TagWire::Fixed64, ValueShape::I64) => Kind::Sfixed64,
        (TagWire::Fixed64, ValueShape::F64) => Kind::Double,
        (TagWire::Bytes, ValueShape::String) => Kind::String,
        (TagWire::Bytes, ValueShape::Bytes) => Kind::Bytes,
        (TagWire::Bytes, ValueShape::Message(target)) if target.is_message() => Kind::Message,
        (TagWire::Bytes, ValueShape::Map { .. }) => Kind::Message,
        (TagWire::Group, ValueShape::Message(target)) if target.is_message() => Kind::Group,
        _ => return None,
    };
    Some(kind)
}

fn shape_name(shape: &ValueShape) -> &'static str {
    match shape {
        ValueShape::Bool => "bool",
        ValueShape::I32 => "i32",
        ValueShape::I64 => "i64",
        ValueShape::U32 => "u32",
        ValueShape::U64 => "u64",
        ValueShape::F32 => "f32",
        ValueShape::F64 => "f64",
        ValueShape::String => "string",
        ValueShape::Bytes => "bytes",
        ValueShape::Enum(_) => "enum",
        ValueShape::Message(_) => "message",
        ValueShape::Map { .. } => "map",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use crate::{
        descriptor::{Cardinality, DefaultValue, Descriptor, Kind, Syntax},
        legacy::{FieldMetadata, LegacyEngine, LegacyEnum, LegacyMessage, LegacyType, ValueShape},
        Error,
    };

    struct Outer;
    struct OuterInner;
    struct OuterResult;
    struct Mood;

    impl LegacyMessage for Outer {
        fn runtime_name() -> &'static str {
            "Outer"
        }

        fn package() -> Option<&'static str> {
            Some("legacy.test")
        }

        fn fields() -> Vec<FieldMetadata> {
            vec![
                FieldMetadata::new("Id", "varint,1,opt,name=id,def=7", ValueShape::I64),
                FieldMetadata::new("Inner", "bytes,2,opt,name=inner", ValueShape::Message(
                    LegacyType::message::<OuterInner>(),
                )),
                FieldMetadata::map(
                    "Labels",
                    "bytes,3,rep,name=labels",
                    FieldMetadata::new("", "bytes,1,opt,name=key", ValueShape::String),
                    FieldMetadata::new("", "varint,2,opt,name=value", ValueShape::Enum(
                        LegacyType::enumeration::<Mood>(),
                    )),
                ),
                FieldMetadata::new("Result", "group,4,opt", ValueShape::Message(
                    LegacyType::message::<OuterResult>(),
                )),
                FieldMetadata::new("Name", "bytes,5,opt,name=name", ValueShape::String)
                    .in_oneof("choice"),
                FieldMetadata::new("Code", "zigzag32,6,opt,name=code", ValueShape::I32)
                    .in_oneof("choice"),
                FieldMetadata::new("Deltas", "fixed64,7,rep,packed,name=deltas,json=allDeltas", ValueShape::I64),
            ]
        }

        fn oneof_names() -> Vec<&'static str> {
            vec!["choice"]
        }
    }

    impl LegacyMessage for OuterInner {
        fn runtime_name() -> &'static str {
            "Outer_Inner"
        }

        fn enclosing_type() -> Option<LegacyType> {
            Some(LegacyType::message::<Outer>())
        }

        fn fields() -> Vec<FieldMetadata> {
            vec![
                FieldMetadata::new("Back", "bytes,1,opt,name=back", ValueShape::Message(
                    LegacyType::message::<Outer>(),
                )),
                FieldMetadata::new("Myself", "bytes,2,rep,name=myself", ValueShape::Message(
                    LegacyType::message::<OuterInner>(),
                )),
            ]
        }
    }

    impl LegacyMessage for OuterResult {
        fn runtime_name() -> &'static str {
            "Outer_Result"
        }

        fn enclosing_type() -> Option<LegacyType> {
            Some(LegacyType::message::<Outer>())
        }

        fn fields() -> Vec<FieldMetadata> {
            vec![FieldMetadata::new("Url", "bytes,5,opt,name=url", ValueShape::String)]
        }
    }

    impl LegacyEnum for Mood {
        fn runtime_name() -> &'static str {
            "Mood"
        }

        fn package() -> Option<&'static str> {
            Some("legacy.test")
        }

        fn values() -> Vec<(&'static str, i32)> {
            vec![("SAD", 2), ("HAPPY", 1), ("UNKNOWN", 0)]
        }
    }

    #[test]
    fn names_and_nesting() {
        let engine = LegacyEngine::new();
        let outer = engine.message::<Outer>().unwrap();
        assert_eq!(outer.full_name(), "legacy.test.Outer");
        assert_eq!(outer.syntax, Syntax::Proto2);

        let inner = outer.fields[1].message_type().unwrap();
        assert_eq!(inner.full_name(), "legacy.test.Outer.Inner");
        assert_eq!(inner.name(), "Inner");

        // referenced types were inferred in the same run
        let direct = engine.message::<OuterInner>().unwrap();
        assert!(Arc::ptr_eq(&inner, &direct));
        assert_eq!(engine.inferred_count(), 4);
    }

    #[test]
    fn recursion_is_linked() {
        let engine = LegacyEngine::new();
        let inner = engine.message::<OuterInner>().unwrap();
        let back = inner.field_by_name("back").unwrap().message_type().unwrap();
        assert_eq!(back.full_name(), "legacy.test.Outer");
        let myself = inner.field_by_name("myself").unwrap().message_type().unwrap();
        assert!(Arc::ptr_eq(&myself, &inner));
        assert!(back.fields[1].message_type().is_some());
    }

    #[test]
    fn field_details() {
        let engine = LegacyEngine::new();
        let outer = engine.message::<Outer>().unwrap();

        let id = outer.field_by_name("id").unwrap();
        assert_eq!(id.kind, Kind::Int64);
        assert_eq!(id.default_value, Some(DefaultValue::Int64(7)));
        assert_eq!(id.json_name, "id");

        let labels = outer.field_by_name("labels").unwrap();
        assert!(labels.is_map());
        let entry = labels.message_type().unwrap();
        assert_eq!(entry.full_name(), "legacy.test.Outer.LabelsEntry");
        assert!(entry.is_map_entry);
        assert!(entry.runtime_type().is_none());
        assert_eq!(outer.runtime_type(), Some(crate::descriptor::TypeHandle::of::<Outer>()));
        assert_eq!(entry.map_key().unwrap().kind, Kind::String);
        let mood = entry.map_value().unwrap().enum_type().unwrap();
        assert_eq!(mood.full_name(), "legacy.test.Mood");

        let result = outer.field_by_number(4).unwrap();
        assert_eq!(result.kind, Kind::Group);
        assert_eq!(result.name, "result");
        assert_eq!(result.message_type().unwrap().name(), "Result");

        let code = outer.field_by_name("code").unwrap();
        assert_eq!(code.kind, Kind::Sint32);
        assert_eq!(code.containing_oneof().unwrap().name(), "choice");
        assert_eq!(outer.oneofs[0].fields().len(), 2);

        let deltas = outer.field_by_name("deltas").unwrap();
        assert_eq!(deltas.kind, Kind::Sfixed64);
        assert_eq!(deltas.cardinality, Cardinality::Repeated);
        assert!(deltas.is_packed());
        assert_eq!(deltas.json_name, "allDeltas");
    }

    #[test]
    fn enum_values_sorted() {
        let engine = LegacyEngine::new();
        let mood = engine.enumeration::<Mood>().unwrap();
        let names: Vec<_> = mood.values.iter().map(|value| value.name.as_str()).collect();
        assert_eq!(names, vec!["UNKNOWN", "HAPPY", "SAD"]);
        assert_eq!(mood.values[0].full_name(), "legacy.test.UNKNOWN");
    }

    struct Broken;
    struct UsesBroken;

    impl LegacyMessage for Broken {
        fn runtime_name() -> &'static str {
            "Broken"
        }

        fn fields() -> Vec<FieldMetadata> {
            vec![FieldMetadata::new("X", "varint,one,opt", ValueShape::I32)]
        }
    }

    impl LegacyMessage for UsesBroken {
        fn runtime_name() -> &'static str {
            "UsesBroken"
        }

        fn fields() -> Vec<FieldMetadata> {
            vec![FieldMetadata::new("B", "bytes,1,opt,name=b", ValueShape::Message(
                LegacyType::message::<Broken>(),
            ))]
        }
    }

    #[test]
    fn failures_are_cached_and_propagate() {
        let engine = LegacyEngine::new();
        let err = engine.message::<UsesBroken>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedLegacyShape(_)));
        assert_eq!(engine.message::<Broken>().unwrap_err(), err);
        assert_eq!(engine.inferred_count(), 2);
        assert!(engine.message::<UsesBroken>().is_err());
        assert_eq!(engine.inferred_count(), 2);
    }

    struct WrongShape;

    impl LegacyMessage for WrongShape {
        fn runtime_name() -> &'static str {
            "WrongShape"
        }

        fn fields() -> Vec<FieldMetadata> {
            vec![FieldMetadata::new("F", "fixed32,1,opt,name=f", ValueShape::String)]
        }
    }

    #[test]
    fn wire_and_shape_must_agree() {
        let engine = LegacyEngine::new();
        assert!(matches!(
            engine.message::<WrongShape>(),
            Err(Error::UnsupportedLegacyShape(_))
        ));
    }

    static COUNTED_CALLS: AtomicUsize = AtomicUsize::new(0);
    struct Counted;

    impl LegacyMessage for Counted {
        fn runtime_name() -> &'static str {
            "Counted"
        }

        fn fields() -> Vec<FieldMetadata> {
            COUNTED_CALLS.fetch_add(1, Ordering::SeqCst);
            vec![FieldMetadata::new("V", "bytes,1,opt,name=v,proto3", ValueShape::Bytes)]
        }
    }

    #[test]
    fn concurrent_first_access_infers_once() {
        let engine = Arc::new(LegacyEngine::new());
        let results: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                std::thread::spawn(move || engine.message::<Counted>().unwrap())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|thread| thread.join().unwrap())
            .collect();

        assert_eq!(COUNTED_CALLS.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|message| Arc::ptr_eq(message, &results[0])));
        assert_eq!(results[0].syntax, Syntax::Proto3);
    }

    struct Shared;
    struct Left;
    struct Right;

    impl LegacyMessage for Shared {
        fn runtime_name() -> &'static str {
            "Shared"
        }

        fn fields() -> Vec<FieldMetadata> {
            vec![FieldMetadata::new("N", "varint,1,opt,name=n", ValueShape::I32)]
        }
    }

    impl LegacyMessage for Left {
        fn runtime_name() -> &'static str {
            "Left"
        }

        fn fields() -> Vec<FieldMetadata> {
            vec![FieldMetadata::new("S", "bytes,1,opt,name=s", ValueShape::Message(
                LegacyType::message::<Shared>(),
            ))]
        }
    }

    impl LegacyMessage for Right {
        fn runtime_name() -> &'static str {
            "Right"
        }

        fn fields() -> Vec<FieldMetadata> {
            vec![FieldMetadata::new("S", "bytes,1,opt,name=s", ValueShape::Message(
                LegacyType::message::<Shared>(),
            ))]
        }
    }

    #[test]
    fn unrelated_roots_share_one_node_per_type() {
        let engine = Arc::new(LegacyEngine::new());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    let root = if i % 2 == 0 {
                        engine.message::<Left>().unwrap()
                    } else {
                        engine.message::<Right>().unwrap()
                    };
                    root.fields[0].message_type().unwrap()
                })
            })
            .collect();
        let shared: Vec<_> = threads
            .into_iter()
            .map(|thread| thread.join().unwrap())
            .collect();

        let cached = engine.message::<Shared>().unwrap();
        assert!(shared.iter().all(|node| Arc::ptr_eq(node, &cached)));
        assert_eq!(engine.inferred_count(), 3);
    }
}
