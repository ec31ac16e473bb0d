//! Enum declarations.

use std::{
    collections::HashMap,
    ops::RangeInclusive,
    sync::{Arc, OnceLock},
};

use crate::{
    descriptor::{EnumValueRc, Parent, Syntax, TypeHandle},
    proto::RawOptions,
    Error, Result,
};

/// An enum type.
pub struct EnumDescriptor {
    /// Fully qualified name
    pub full_name: String,
    /// Local name
    pub name: String,
    /// Position among the parent's enums
    pub index: usize,
    /// Syntax of the declaring file
    pub syntax: Syntax,
    pub(crate) parent: OnceLock<Parent>,
    /// Values in declaration order
    pub values: Vec<EnumValueRc>,
    /// Reserved numbers, end inclusive
    pub reserved_ranges: Vec<RangeInclusive<i32>>,
    /// Reserved value names
    pub reserved_names: Vec<String>,
    /// `allow_alias` option
    pub allow_alias: bool,
    /// `deprecated` option
    pub deprecated: bool,
    /// Raw `EnumOptions`
    pub options: Option<RawOptions>,
    pub(crate) by_name: HashMap<String, usize>,
    pub(crate) by_number: HashMap<i32, usize>,
    pub(crate) runtime_type: OnceLock<TypeHandle>,
}

impl_descriptor!(EnumDescriptor);

impl EnumDescriptor {
    /// Look up a value by name.
    #[must_use]
    pub fn value_by_name(&self, name: &str) -> Option<&EnumValueRc> {
        self.by_name.get(name).map(|&index| &self.values[index])
    }

    /// Look up a value by number; with aliases, the first declared value wins.
    #[must_use]
    pub fn value_by_number(&self, number: i32) -> Option<&EnumValueRc> {
        self.by_number.get(&number).map(|&index| &self.values[index])
    }

    /// The value used when a field of this enum is unset.
    #[must_use]
    pub fn default_value(&self) -> Option<&EnumValueRc> {
        self.values.first()
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

    /// The runtime type bound to this enum, if any.
    #[must_use]
    pub fn runtime_type(&self) -> Option<TypeHandle> {
        self.runtime_type.get().copied()
    }

    /// Bind the runtime type representing this enum.
    ///
    /// # Errors
    /// Returns [`crate::Error::NameConflict`] if a different handle is already bound.
    pub fn bind_runtime_type(&self, handle: TypeHandle) -> Result<()> {
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
        let parent = Parent::Enum(Arc::downgrade(self));
        for value in &self.values {
            value.set_parent(parent.clone());
        }
    }
}

impl std::fmt::Debug for EnumDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumDescriptor")
            .field("full_name", &self.full_name)
            .field("values", &self.values.len())
            .finish_non_exhaustive()
    }
}

/// A value of an enum.
///
/// Following protobuf scoping, the full name of a value is a sibling of its enum: value `RED`
/// of `pkg.Color` is `pkg.RED`.
#[derive(Debug)]
pub struct EnumValueDescriptor {
    /// Fully qualified name
    pub full_name: String,
    /// Local name
    pub name: String,
    /// Position within the enum
    pub index: usize,
    /// Syntax of the declaring file
    pub syntax: Syntax,
    pub(crate) parent: OnceLock<Parent>,
    /// Numeric value
    pub number: i32,
    /// `deprecated` option
    pub deprecated: bool,
    /// Raw `EnumValueOptions`
    pub options: Option<RawOptions>,
}

impl_descriptor!(EnumValueDescriptor);

impl EnumValueDescriptor {
    pub(crate) fn set_parent(&self, parent: Parent) {
        let _ = self.parent.set(parent);
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        descriptor::{build_file, Descriptor, DescriptorRef},
        proto::{FileDescriptorProto, SchemaMessage},
        test::{enumeration, DEPRECATED_PROTO},
        validation::ValidationConfig,
    };

    #[test]
    fn value_scoping_and_lookup() {
        let proto = FileDescriptorProto::decode(DEPRECATED_PROTO).unwrap();
        let file = build_file(&proto, DEPRECATED_PROTO.to_vec(), &ValidationConfig::default())
            .unwrap();
        let enumeration = &file.enums[0];

        assert!(enumeration.deprecated);
        let value = enumeration.value_by_name("DEPRECATED").unwrap();
        assert_eq!(value.full_name, "goproto.protoc.comments.DEPRECATED");
        assert!(value.deprecated);
        assert_eq!(enumeration.value_by_number(0).unwrap().name, "DEPRECATED");
        match value.parent().unwrap() {
            DescriptorRef::Enum(parent) => assert_eq!(parent.name, "DeprecatedEnum"),
            other => panic!("unexpected parent {other:?}"),
        }
    }

    #[test]
    fn aliases_resolve_to_first() {
        let mut aliased = enumeration("Mode", &[("AUTO", 0), ("DEFAULT", 0), ("ON", 1)]);
        aliased.options = crate::proto::RawOptions::from_flags(&[(
            crate::proto::enum_options::ALLOW_ALIAS,
            true,
        )]);
        let proto = FileDescriptorProto {
            name: Some("alias.proto".into()),
            enum_type: vec![aliased],
            ..Default::default()
        };

        let file = build_file(&proto, proto.encode_to_vec(), &ValidationConfig::default()).unwrap();
        let mode = &file.enums[0];
        assert!(mode.allow_alias);
        assert_eq!(mode.value_by_number(0).unwrap().name, "AUTO");
        assert_eq!(mode.value_by_name("DEFAULT").unwrap().number, 0);
        assert_eq!(mode.default_value().unwrap().name, "AUTO");
    }
}
