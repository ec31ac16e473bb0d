//! Message declarations.

use std::{
    collections::HashMap,
    ops::Range,
    sync::{Arc, OnceLock},
};

use crate::{
    descriptor::{EnumRc, FieldRc, MessageRc, OneofRc, Parent, Syntax, TypeHandle},
    proto::RawOptions,
    Error, Result,
};

/// One declared range of extension numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionRangeInfo {
    /// Numbers covered, end exclusive
    pub range: Range<i32>,
    /// Raw `ExtensionRangeOptions`
    pub options: Option<RawOptions>,
}

/// A message type.
pub struct MessageDescriptor {
    /// Fully qualified name
    pub full_name: String,
    /// Local name
    pub name: String,
    /// Position among the parent's messages
    pub index: usize,
    /// Syntax of the declaring file
    pub syntax: Syntax,
    pub(crate) parent: OnceLock<Parent>,
    /// Fields in declaration order
    pub fields: Vec<FieldRc>,
    /// Oneofs in declaration order
    pub oneofs: Vec<OneofRc>,
    /// Nested messages (including synthetic map entries)
    pub messages: Vec<MessageRc>,
    /// Nested enums
    pub enums: Vec<EnumRc>,
    /// Extensions declared in the scope of this message
    pub extensions: Vec<FieldRc>,
    /// Reserved field numbers, end exclusive
    pub reserved_ranges: Vec<Range<i32>>,
    /// Reserved field names
    pub reserved_names: Vec<String>,
    /// Extension number ranges
    pub extension_ranges: Vec<ExtensionRangeInfo>,
    /// Synthetic key/value message backing a map field
    pub is_map_entry: bool,
    /// `deprecated` option
    pub deprecated: bool,
    /// Raw `MessageOptions`
    pub options: Option<RawOptions>,
    pub(crate) by_name: HashMap<String, usize>,
    pub(crate) by_number: HashMap<i32, usize>,
    pub(crate) by_json_name: HashMap<String, usize>,
    pub(crate) runtime_type: OnceLock<TypeHandle>,
}

impl_descriptor!(MessageDescriptor);

impl MessageDescriptor {
    /// Look up a field by name.
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&FieldRc> {
        self.by_name.get(name).map(|&index| &self.fields[index])
    }

    /// Look up a field by number.
    #[must_use]
    pub fn field_by_number(&self, number: i32) -> Option<&FieldRc> {
        self.by_number.get(&number).map(|&index| &self.fields[index])
    }

    /// Look up a field by JSON name.
    #[must_use]
    pub fn field_by_json_name(&self, json_name: &str) -> Option<&FieldRc> {
        self.by_json_name
            .get(json_name)
            .map(|&index| &self.fields[index])
    }

    /// Look up a oneof by name.
    #[must_use]
    pub fn oneof_by_name(&self, name: &str) -> Option<&OneofRc> {
        self.oneofs.iter().find(|oneof| oneof.name == name)
    }

    /// Look up a nested message by local name.
    #[must_use]
    pub fn message_by_name(&self, name: &str) -> Option<&MessageRc> {
        self.messages.iter().find(|message| message.name == name)
    }

    /// Look up a nested enum by local name.
    #[must_use]
    pub fn enum_by_name(&self, name: &str) -> Option<&EnumRc> {
        self.enums.iter().find(|enumeration| enumeration.name == name)
    }

    /// The key field of a map entry.
    #[must_use]
    pub fn map_key(&self) -> Option<&FieldRc> {
        if self.is_map_entry {
            self.field_by_number(1)
        } else {
            None
        }
    }

    /// The value field of a map entry.
    #[must_use]
    pub fn map_value(&self) -> Option<&FieldRc> {
        if self.is_map_entry {
            self.field_by_number(2)
        } else {
            None
        }
    }

    /// Returns `true` if `number` lies in a reserved range.
    #[must_use]
    pub fn is_reserved_number(&self, number: i32) -> bool {
        self.reserved_ranges
            .iter()
            .any(|range| range.contains(&number))
    }

    /// Returns `true` if `name` is reserved.
    #[must_use]
    pub fn is_reserved_name(&self, name: &str) -> bool {
        self.reserved_names.iter().any(|reserved| reserved == name)
    }

    /// Returns `true` if `number` lies in a declared extension range.
    #[must_use]
    pub fn is_extension_number(&self, number: i32) -> bool {
        self.extension_ranges
            .iter()
            .any(|info| info.range.contains(&number))
    }

    /// The runtime type bound to this message, if any.
    #[must_use]
    pub fn runtime_type(&self) -> Option<TypeHandle> {
        self.runtime_type.get().copied()
    }

    /// Bind the runtime type representing this message.
    ///
    /// Binding is set-once; re-binding the same handle is a no-op.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for map entries, which never carry a runtime type,
    /// and [`crate::Error::NameConflict`] if a different handle is already bound.
    pub fn bind_runtime_type(&self, handle: TypeHandle) -> Result<()> {
        if self.is_map_entry {
            return Err(malformed_error!(
                "Map entry {} cannot be bound to runtime type {}",
                self.full_name,
                handle
            ));
        }

        let bound = self.runtime_type.get_or_init(|| handle);
        if *bound == handle {
            Ok(())
        } else {
            Err(Error::NameConflict(format!(
                "{} is bound to {} and cannot be bound to {}",
                self.full_name, bound, handle
            )))
        }
    }

    pub(crate) fn set_parent(&self, parent: Parent) {
        let _ = self.parent.set(parent);
    }

    pub(crate) fn adopt_children(self: &Arc<Self>) {
        let parent = Parent::Message(Arc::downgrade(self));
        for field in self.fields.iter().chain(&self.extensions) {
            field.set_parent(parent.clone());
        }
        for oneof in &self.oneofs {
            oneof.set_parent(parent.clone());
        }
        for message in &self.messages {
            message.set_parent(parent.clone());
        }
        for enumeration in &self.enums {
            enumeration.set_parent(parent.clone());
        }
    }
}

impl std::fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDescriptor")
            .field("full_name", &self.full_name)
            .field("fields", &self.fields.len())
            .field("is_map_entry", &self.is_map_entry)
            .finish_non_exhaustive()
    }
}
