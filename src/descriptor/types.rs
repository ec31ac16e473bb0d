//! Value types shared by the descriptor nodes.

use std::{
    any::TypeId,
    fmt,
    sync::{Arc, Weak},
};

use bitflags::bitflags;
use strum::{Display, EnumIter, EnumString};

use crate::{
    descriptor::{EnumDescriptor, EnumRc, MessageDescriptor, MessageRc},
    proto::{FieldLabel, FieldType},
    Result,
};

/// Language revision a file is written in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Syntax {
    /// `proto2`; also assumed when the `syntax` field is absent
    #[default]
    Proto2,
    /// `proto3`
    Proto3,
}

impl Syntax {
    /// Interpret the `syntax` field of a file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for anything but `proto2`, `proto3` or absence.
    pub fn from_field(value: Option<&str>) -> Result<Self> {
        match value {
            None | Some("" | "proto2") => Ok(Syntax::Proto2),
            Some("proto3") => Ok(Syntax::Proto3),
            Some(other) => Err(malformed_error!("Unknown syntax '{}'", other)),
        }
    }

    /// The value written to the `syntax` field; proto2 files leave it absent.
    #[must_use]
    pub fn to_field(self) -> Option<String> {
        match self {
            Syntax::Proto2 => None,
            Syntax::Proto3 => Some("proto3".to_string()),
        }
    }
}

/// The kind of value a field holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[allow(missing_docs)]
pub enum Kind {
    Bool,
    Enum,
    Int32,
    Sint32,
    Uint32,
    Int64,
    Sint64,
    Uint64,
    Sfixed32,
    Fixed32,
    Float,
    Sfixed64,
    Fixed64,
    Double,
    String,
    Bytes,
    Message,
    Group,
}

impl Kind {
    /// Returns `true` for message and group kinds.
    #[must_use]
    pub fn is_message(self) -> bool {
        matches!(self, Kind::Message | Kind::Group)
    }

    /// Returns `true` for kinds that reference another declaration.
    #[must_use]
    pub fn is_reference(self) -> bool {
        self.is_message() || self == Kind::Enum
    }

    /// Returns `true` for kinds that may use the packed encoding.
    #[must_use]
    pub fn is_packable(self) -> bool {
        !matches!(self, Kind::String | Kind::Bytes | Kind::Message | Kind::Group)
    }

    /// Returns `true` for kinds allowed as map keys.
    #[must_use]
    pub fn is_valid_map_key(self) -> bool {
        !matches!(
            self,
            Kind::Float | Kind::Double | Kind::Bytes | Kind::Enum | Kind::Message | Kind::Group
        )
    }
}

impl From<FieldType> for Kind {
    fn from(value: FieldType) -> Self {
        match value {
            FieldType::Double => Kind::Double,
            FieldType::Float => Kind::Float,
            FieldType::Int64 => Kind::Int64,
            FieldType::Uint64 => Kind::Uint64,
            FieldType::Int32 => Kind::Int32,
            FieldType::Fixed64 => Kind::Fixed64,
            FieldType::Fixed32 => Kind::Fixed32,
            FieldType::Bool => Kind::Bool,
            FieldType::String => Kind::String,
            FieldType::Group => Kind::Group,
            FieldType::Message => Kind::Message,
            FieldType::Bytes => Kind::Bytes,
            FieldType::Uint32 => Kind::Uint32,
            FieldType::Enum => Kind::Enum,
            FieldType::Sfixed32 => Kind::Sfixed32,
            FieldType::Sfixed64 => Kind::Sfixed64,
            FieldType::Sint32 => Kind::Sint32,
            FieldType::Sint64 => Kind::Sint64,
        }
    }
}

impl From<Kind> for FieldType {
    fn from(value: Kind) -> Self {
        match value {
            Kind::Double => FieldType::Double,
            Kind::Float => FieldType::Float,
            Kind::Int64 => FieldType::Int64,
            Kind::Uint64 => FieldType::Uint64,
            Kind::Int32 => FieldType::Int32,
            Kind::Fixed64 => FieldType::Fixed64,
            Kind::Fixed32 => FieldType::Fixed32,
            Kind::Bool => FieldType::Bool,
            Kind::String => FieldType::String,
            Kind::Group => FieldType::Group,
            Kind::Message => FieldType::Message,
            Kind::Bytes => FieldType::Bytes,
            Kind::Uint32 => FieldType::Uint32,
            Kind::Enum => FieldType::Enum,
            Kind::Sfixed32 => FieldType::Sfixed32,
            Kind::Sfixed64 => FieldType::Sfixed64,
            Kind::Sint32 => FieldType::Sint32,
            Kind::Sint64 => FieldType::Sint64,
        }
    }
}

/// How many values a field holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Cardinality {
    /// Zero or one value
    Optional,
    /// Exactly one value (proto2 only)
    Required,
    /// Any number of values
    Repeated,
}

impl From<FieldLabel> for Cardinality {
    fn from(value: FieldLabel) -> Self {
        match value {
            FieldLabel::Optional => Cardinality::Optional,
            FieldLabel::Required => Cardinality::Required,
            FieldLabel::Repeated => Cardinality::Repeated,
        }
    }
}

impl From<Cardinality> for FieldLabel {
    fn from(value: Cardinality) -> Self {
        match value {
            Cardinality::Optional => FieldLabel::Optional,
            Cardinality::Required => FieldLabel::Required,
            Cardinality::Repeated => FieldLabel::Repeated,
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    /// Boolean properties of a field
    pub struct FieldFlags: u16 {
        /// The field is an extension
        const EXTENSION = 0x0001;
        /// The `packed` option is present
        const PACKED_EXPLICIT = 0x0002;
        /// The `packed` option is present and set
        const PACKED = 0x0004;
        /// The `weak` option is set
        const WEAK = 0x0008;
        /// The `lazy` option is set
        const LAZY = 0x0010;
        /// The `deprecated` option is set
        const DEPRECATED = 0x0020;
        /// The JSON name was stored explicitly rather than derived
        const HAS_JSON_NAME = 0x0040;
        /// A proto3 `optional` field, backed by a synthetic oneof
        const PROTO3_OPTIONAL = 0x0080;
    }
}

/// The parsed default value of a proto2 field.
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultValue {
    /// `bool`
    Bool(bool),
    /// `int32`, `sint32`, `sfixed32`
    Int32(i32),
    /// `int64`, `sint64`, `sfixed64`
    Int64(i64),
    /// `uint32`, `fixed32`
    Uint32(u32),
    /// `uint64`, `fixed64`
    Uint64(u64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `string`
    String(String),
    /// `bytes`, after unescaping
    Bytes(Vec<u8>),
    /// `enum`, the name of the default value
    Enum(String),
}

impl DefaultValue {
    /// Parse the textual default stored in `default_value` for a field of the given kind.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the text does not parse as the kind, or if the
    /// kind cannot carry a default.
    pub fn parse(kind: Kind, text: &str) -> Result<Self> {
        let invalid = || malformed_error!("Invalid default '{}' for {} field", text, kind);

        Ok(match kind {
            Kind::Bool => match text {
                "true" => DefaultValue::Bool(true),
                "false" => DefaultValue::Bool(false),
                _ => return Err(invalid()),
            },
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
                DefaultValue::Int32(text.parse().map_err(|_| invalid())?)
            }
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
                DefaultValue::Int64(text.parse().map_err(|_| invalid())?)
            }
            Kind::Uint32 | Kind::Fixed32 => {
                DefaultValue::Uint32(text.parse().map_err(|_| invalid())?)
            }
            Kind::Uint64 | Kind::Fixed64 => {
                DefaultValue::Uint64(text.parse().map_err(|_| invalid())?)
            }
            #[allow(clippy::cast_possible_truncation)]
            Kind::Float => DefaultValue::Float(parse_float(text).ok_or_else(invalid)? as f32),
            Kind::Double => DefaultValue::Double(parse_float(text).ok_or_else(invalid)?),
            Kind::String => DefaultValue::String(text.to_string()),
            Kind::Bytes => DefaultValue::Bytes(unescape_bytes(text).ok_or_else(invalid)?),
            Kind::Enum => DefaultValue::Enum(text.to_string()),
            Kind::Message | Kind::Group => return Err(invalid()),
        })
    }
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => text.parse().ok(),
    }
}

/// Undo the C-style escaping protoc applies to `bytes` defaults.
fn unescape_bytes(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let escape = *bytes.get(i + 1)?;
        i += 2;
        match escape {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'"' => out.push(b'"'),
            b'\'' => out.push(b'\''),
            b'\\' => out.push(b'\\'),
            b'?' => out.push(b'?'),
            b'0'..=b'7' => {
                let mut value = u32::from(escape - b'0');
                let mut digits = 1;
                while digits < 3 {
                    match bytes.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            i += 1;
                            digits += 1;
                        }
                        _ => break,
                    }
                }
                out.push(u8::try_from(value).ok()?);
            }
            b'x' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    match bytes.get(i).and_then(|d| char::from(*d).to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            i += 1;
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    return None;
                }
                out.push(u8::try_from(value).ok()?);
            }
            _ => return None,
        }
    }

    Some(out)
}

/// Opaque identity of a concrete runtime type bound to a message or enum descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    id: TypeId,
    name: &'static str,
}

impl TypeHandle {
    /// The handle of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeHandle {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` of the runtime type.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The Rust name of the runtime type, for diagnostics only.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.name)
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Clone, Debug)]
enum TypeRefTarget {
    Message(Weak<MessageDescriptor>),
    Enum(Weak<EnumDescriptor>),
}

/// A resolved reference from a field, extension or method to a message or enum.
///
/// The full name is kept alongside a weak handle; references never keep their target alive,
/// so cycles between declarations (and between files) cannot leak.
#[derive(Clone, Debug)]
pub struct TypeRef {
    full_name: String,
    target: TypeRefTarget,
}

impl TypeRef {
    /// Reference a message.
    #[must_use]
    pub fn message(target: &MessageRc) -> Self {
        TypeRef {
            full_name: target.full_name.clone(),
            target: TypeRefTarget::Message(Arc::downgrade(target)),
        }
    }

    /// Reference an enum.
    #[must_use]
    pub fn enumeration(target: &EnumRc) -> Self {
        TypeRef {
            full_name: target.full_name.clone(),
            target: TypeRefTarget::Enum(Arc::downgrade(target)),
        }
    }

    /// Full name of the referenced declaration.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Returns `true` if the reference points at a message.
    #[must_use]
    pub fn is_message(&self) -> bool {
        matches!(self.target, TypeRefTarget::Message(_))
    }

    /// The referenced message, if this is a message reference and the target is alive.
    #[must_use]
    pub fn upgrade_message(&self) -> Option<MessageRc> {
        match &self.target {
            TypeRefTarget::Message(weak) => weak.upgrade(),
            TypeRefTarget::Enum(_) => None,
        }
    }

    /// The referenced enum, if this is an enum reference and the target is alive.
    #[must_use]
    pub fn upgrade_enum(&self) -> Option<EnumRc> {
        match &self.target {
            TypeRefTarget::Enum(weak) => weak.upgrade(),
            TypeRefTarget::Message(_) => None,
        }
    }

    /// Check if the referenced declaration is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match &self.target {
            TypeRefTarget::Message(weak) => weak.strong_count() > 0,
            TypeRefTarget::Enum(weak) => weak.strong_count() > 0,
        }
    }
}
