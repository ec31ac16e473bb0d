//! The immutable descriptor tree.
//!
//! A [`FileDescriptor`] owns every declaration of one schema file: messages with their
//! fields, oneofs and nested declarations, enums with their values, extensions, and services
//! with their methods. Nodes are reference counted (`Arc`), children are owned by their
//! parent, and every back-reference (child to parent, field to referenced type) is weak.
//! References across files are resolved through the [`crate::Registry`] by full name and only
//! a weak handle is cached, so dependency cycles and out-of-order loading never create strong
//! cycles.
//!
//! # Key Components
//!
//! - [`Descriptor`] - capability shared by all nodes (names, parent, file, syntax, options)
//! - [`DescriptorRef`] - type-erased handle to any node
//! - [`FileDescriptor`], [`MessageDescriptor`], [`FieldDescriptor`], [`OneofDescriptor`],
//!   [`EnumDescriptor`], [`EnumValueDescriptor`], [`ServiceDescriptor`],
//!   [`MethodDescriptor`] - the node types
//! - [`TypeRef`] - a resolved message or enum reference
//! - [`TypeHandle`] - identity of the runtime type bound to a message or enum
//!
//! # Lifecycle
//!
//! Nodes are created by the shared constructor in this module (used by the file builder, the
//! proto converter and the legacy engine), linked once, and never mutated afterwards except
//! for the set-once runtime type binding.
//!
//! # Examples
//!
//! ```rust
//! use protolens::{Registry, FileBuilder};
//! use protolens::descriptor::{Descriptor, Kind};
//!
//! # let bytes = std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/samples/deprecated.pb"))?;
//! let registry = Registry::new();
//! let handle = registry.register_raw_file(FileBuilder::new(bytes))?;
//! let file = handle.descriptor()?;
//!
//! let message = &file.messages[0];
//! assert_eq!(message.full_name(), "goproto.protoc.comments.DeprecatedMessage");
//! let field = message.field_by_name("deprecated_field").unwrap();
//! assert_eq!(field.kind, Kind::String);
//! assert!(field.is_deprecated());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Implements [`Descriptor`] for a node struct with the common field layout.
macro_rules! impl_descriptor {
    ($ty:ty) => {
        impl $crate::descriptor::Descriptor for $ty {
            fn full_name(&self) -> &str {
                &self.full_name
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn index(&self) -> usize {
                self.index
            }

            fn parent(&self) -> Option<$crate::descriptor::DescriptorRef> {
                self.parent.get().and_then($crate::descriptor::Parent::upgrade)
            }

            fn syntax(&self) -> $crate::descriptor::Syntax {
                self.syntax
            }

            fn options(&self) -> Option<&$crate::proto::RawOptions> {
                self.options.as_ref()
            }
        }
    };
}

mod construct;
mod enums;
mod field;
mod file;
mod message;
mod oneof;
mod service;
mod types;

use std::sync::{Arc, Weak};

pub(crate) use construct::{
    build_enum, build_file, build_message, ReferenceSlot, SlotKind, MAX_NESTING_DEPTH,
};
pub use enums::{EnumDescriptor, EnumValueDescriptor};
pub use field::FieldDescriptor;
pub use file::FileDescriptor;
pub use message::{ExtensionRangeInfo, MessageDescriptor};
pub use oneof::OneofDescriptor;
pub use service::{MethodDescriptor, ServiceDescriptor};
pub use types::{Cardinality, DefaultValue, FieldFlags, Kind, Syntax, TypeHandle, TypeRef};

use crate::proto::RawOptions;

/// Reference to a `FileDescriptor`
pub type FileRc = Arc<FileDescriptor>;
/// Reference to a `MessageDescriptor`
pub type MessageRc = Arc<MessageDescriptor>;
/// Reference to a `FieldDescriptor`
pub type FieldRc = Arc<FieldDescriptor>;
/// Reference to a `OneofDescriptor`
pub type OneofRc = Arc<OneofDescriptor>;
/// Reference to an `EnumDescriptor`
pub type EnumRc = Arc<EnumDescriptor>;
/// Reference to an `EnumValueDescriptor`
pub type EnumValueRc = Arc<EnumValueDescriptor>;
/// Reference to a `ServiceDescriptor`
pub type ServiceRc = Arc<ServiceDescriptor>;
/// Reference to a `MethodDescriptor`
pub type MethodRc = Arc<MethodDescriptor>;

/// Weak back-reference from a node to the node that declares it.
#[derive(Clone, Debug, Default)]
pub enum Parent {
    /// Declared at file level
    File(Weak<FileDescriptor>),
    /// Declared inside a message (nested types, fields, oneofs, extensions)
    Message(Weak<MessageDescriptor>),
    /// An enum value
    Enum(Weak<EnumDescriptor>),
    /// A method
    Service(Weak<ServiceDescriptor>),
    /// Standalone descriptor without a declaring node
    #[default]
    None,
}

impl Parent {
    /// Upgrade to a strong handle, if there is a parent and it is alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<DescriptorRef> {
        match self {
            Parent::File(weak) => weak.upgrade().map(DescriptorRef::File),
            Parent::Message(weak) => weak.upgrade().map(DescriptorRef::Message),
            Parent::Enum(weak) => weak.upgrade().map(DescriptorRef::Enum),
            Parent::Service(weak) => weak.upgrade().map(DescriptorRef::Service),
            Parent::None => None,
        }
    }
}

/// The capability shared by every descriptor node.
pub trait Descriptor {
    /// Dot-joined fully qualified name.
    fn full_name(&self) -> &str;

    /// Local name.
    fn name(&self) -> &str;

    /// Position among the parent's children of the same kind.
    fn index(&self) -> usize;

    /// The declaring node, `None` for files and standalone descriptors.
    fn parent(&self) -> Option<DescriptorRef>;

    /// Syntax of the declaring file.
    fn syntax(&self) -> Syntax;

    /// Raw options message, if any.
    fn options(&self) -> Option<&RawOptions>;

    /// The file declaring this node, `None` for standalone descriptors.
    fn parent_file(&self) -> Option<FileRc> {
        let mut current = self.parent()?;
        loop {
            match current {
                DescriptorRef::File(file) => return Some(file),
                other => current = other.parent()?,
            }
        }
    }
}

/// A type-erased descriptor node.
#[derive(Clone, Debug)]
pub enum DescriptorRef {
    /// A file
    File(FileRc),
    /// A message
    Message(MessageRc),
    /// A field or extension
    Field(FieldRc),
    /// A oneof
    Oneof(OneofRc),
    /// An enum
    Enum(EnumRc),
    /// An enum value
    EnumValue(EnumValueRc),
    /// A service
    Service(ServiceRc),
    /// A method
    Method(MethodRc),
}

macro_rules! dispatch {
    ($self:ident, $node:ident => $body:expr) => {
        match $self {
            DescriptorRef::File($node) => $body,
            DescriptorRef::Message($node) => $body,
            DescriptorRef::Field($node) => $body,
            DescriptorRef::Oneof($node) => $body,
            DescriptorRef::Enum($node) => $body,
            DescriptorRef::EnumValue($node) => $body,
            DescriptorRef::Service($node) => $body,
            DescriptorRef::Method($node) => $body,
        }
    };
}

impl DescriptorRef {
    /// The message, if this is one.
    #[must_use]
    pub fn as_message(&self) -> Option<&MessageRc> {
        match self {
            DescriptorRef::Message(message) => Some(message),
            _ => None,
        }
    }

    /// The enum, if this is one.
    #[must_use]
    pub fn as_enum(&self) -> Option<&EnumRc> {
        match self {
            DescriptorRef::Enum(enumeration) => Some(enumeration),
            _ => None,
        }
    }

    /// The field, if this is one.
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldRc> {
        match self {
            DescriptorRef::Field(field) => Some(field),
            _ => None,
        }
    }

    /// The service, if this is one.
    #[must_use]
    pub fn as_service(&self) -> Option<&ServiceRc> {
        match self {
            DescriptorRef::Service(service) => Some(service),
            _ => None,
        }
    }

    /// Returns `true` if both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &DescriptorRef) -> bool {
        match (self, other) {
            (DescriptorRef::File(a), DescriptorRef::File(b)) => Arc::ptr_eq(a, b),
            (DescriptorRef::Message(a), DescriptorRef::Message(b)) => Arc::ptr_eq(a, b),
            (DescriptorRef::Field(a), DescriptorRef::Field(b)) => Arc::ptr_eq(a, b),
            (DescriptorRef::Oneof(a), DescriptorRef::Oneof(b)) => Arc::ptr_eq(a, b),
            (DescriptorRef::Enum(a), DescriptorRef::Enum(b)) => Arc::ptr_eq(a, b),
            (DescriptorRef::EnumValue(a), DescriptorRef::EnumValue(b)) => Arc::ptr_eq(a, b),
            (DescriptorRef::Service(a), DescriptorRef::Service(b)) => Arc::ptr_eq(a, b),
            (DescriptorRef::Method(a), DescriptorRef::Method(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Descriptor for DescriptorRef {
    fn full_name(&self) -> &str {
        dispatch!(self, node => node.full_name())
    }

    fn name(&self) -> &str {
        dispatch!(self, node => node.name())
    }

    fn index(&self) -> usize {
        dispatch!(self, node => node.index())
    }

    fn parent(&self) -> Option<DescriptorRef> {
        dispatch!(self, node => node.parent())
    }

    fn syntax(&self) -> Syntax {
        dispatch!(self, node => node.syntax())
    }

    fn options(&self) -> Option<&RawOptions> {
        dispatch!(self, node => node.options())
    }

    fn parent_file(&self) -> Option<FileRc> {
        match self {
            DescriptorRef::File(file) => Some(file.clone()),
            other => dispatch!(other, node => node.parent_file()),
        }
    }
}
