//! Field and extension declarations.

use std::sync::OnceLock;

use crate::{
    descriptor::{
        Cardinality, DefaultValue, Descriptor, DescriptorRef, EnumRc, FieldFlags, Kind,
        MessageRc, OneofRc, Parent, Syntax, TypeRef,
    },
    proto::RawOptions,
};

/// A field of a message, or an extension.
pub struct FieldDescriptor {
    /// Fully qualified name
    pub full_name: String,
    /// Local name
    pub name: String,
    /// Position among the parent's fields (or extensions)
    pub index: usize,
    /// Syntax of the declaring file
    pub syntax: Syntax,
    pub(crate) parent: OnceLock<Parent>,
    /// Field number
    pub number: i32,
    /// JSON name, explicit or derived
    pub json_name: String,
    /// Value kind
    pub kind: Kind,
    /// Optional, required or repeated
    pub cardinality: Cardinality,
    /// Default value exactly as stored
    pub default_text: Option<String>,
    /// Default value parsed for the field kind
    pub default_value: Option<DefaultValue>,
    /// Index of the containing oneof within the parent message
    pub oneof_index: Option<usize>,
    /// Option and presence flags
    pub flags: FieldFlags,
    /// Referenced type name as stored (message, group and enum fields)
    pub type_name: Option<String>,
    /// Extended message name as stored (extensions)
    pub extendee_name: Option<String>,
    /// Raw `FieldOptions`
    pub options: Option<RawOptions>,
    pub(crate) type_ref: OnceLock<TypeRef>,
    pub(crate) extendee: OnceLock<TypeRef>,
}

impl_descriptor!(FieldDescriptor);

impl FieldDescriptor {
    /// Returns `true` for extensions.
    #[must_use]
    pub fn is_extension(&self) -> bool {
        self.flags.contains(FieldFlags::EXTENSION)
    }

    /// Returns `true` if the `deprecated` option is set.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.flags.contains(FieldFlags::DEPRECATED)
    }

    /// Returns `true` if the `weak` option is set.
    #[must_use]
    pub fn is_weak(&self) -> bool {
        self.flags.contains(FieldFlags::WEAK)
    }

    /// Returns `true` if the `lazy` option is set.
    #[must_use]
    pub fn is_lazy(&self) -> bool {
        self.flags.contains(FieldFlags::LAZY)
    }

    /// Returns `true` if the JSON name was stored explicitly.
    #[must_use]
    pub fn has_json_name(&self) -> bool {
        self.flags.contains(FieldFlags::HAS_JSON_NAME)
    }

    /// Returns `true` for proto3 `optional` fields.
    #[must_use]
    pub fn is_proto3_optional(&self) -> bool {
        self.flags.contains(FieldFlags::PROTO3_OPTIONAL)
    }

    /// Returns `true` if repeated values use the packed encoding.
    ///
    /// An explicit `packed` option wins; otherwise proto3 packs repeated scalars by default.
    #[must_use]
    pub fn is_packed(&self) -> bool {
        if self.cardinality != Cardinality::Repeated || !self.kind.is_packable() {
            return false;
        }
        if self.flags.contains(FieldFlags::PACKED_EXPLICIT) {
            return self.flags.contains(FieldFlags::PACKED);
        }
        self.syntax == Syntax::Proto3
    }

    /// Returns `true` for repeated fields that are not maps.
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.cardinality == Cardinality::Repeated && !self.is_map()
    }

    /// Returns `true` for map fields: repeated fields of a map entry type.
    #[must_use]
    pub fn is_map(&self) -> bool {
        self.cardinality == Cardinality::Repeated
            && self
                .message_type()
                .is_some_and(|message| message.is_map_entry)
    }

    /// Returns `true` if the field tracks presence of a set value.
    #[must_use]
    pub fn has_presence(&self) -> bool {
        if self.cardinality == Cardinality::Repeated {
            return false;
        }
        self.syntax == Syntax::Proto2
            || self.kind.is_message()
            || self.oneof_index.is_some()
            || self.is_extension()
    }

    /// The resolved message or enum reference of the field.
    #[must_use]
    pub fn type_ref(&self) -> Option<&TypeRef> {
        self.type_ref.get()
    }

    /// The referenced message type, for message and group fields.
    #[must_use]
    pub fn message_type(&self) -> Option<MessageRc> {
        self.type_ref.get().and_then(TypeRef::upgrade_message)
    }

    /// The referenced enum type, for enum fields.
    #[must_use]
    pub fn enum_type(&self) -> Option<EnumRc> {
        self.type_ref.get().and_then(TypeRef::upgrade_enum)
    }

    /// The resolved extended message, for extensions.
    #[must_use]
    pub fn extendee(&self) -> Option<&TypeRef> {
        self.extendee.get()
    }

    /// The message declaring this field; for extensions, the message in whose scope they
    /// are declared (if any).
    #[must_use]
    pub fn containing_message(&self) -> Option<MessageRc> {
        match self.parent()? {
            DescriptorRef::Message(message) => Some(message),
            _ => None,
        }
    }

    /// The oneof this field belongs to.
    #[must_use]
    pub fn containing_oneof(&self) -> Option<OneofRc> {
        let index = self.oneof_index?;
        self.containing_message()?.oneofs.get(index).cloned()
    }

    pub(crate) fn set_parent(&self, parent: Parent) {
        let _ = self.parent.set(parent);
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("full_name", &self.full_name)
            .field("number", &self.number)
            .field("kind", &self.kind)
            .field("cardinality", &self.cardinality)
            .field("type_ref", &self.type_ref.get().map(TypeRef::full_name))
            .finish_non_exhaustive()
    }
}
