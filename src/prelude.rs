//! # protolens Prelude
//!
//! The types and traits needed by most users of the crate: the registry and its inputs,
//! the descriptor tree with its navigation trait, the converter and the legacy engine.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all protolens operations
pub use crate::Error;

/// The result type used throughout protolens
pub use crate::Result;

/// Configuration for semantic checks during building and conversion
pub use crate::ValidationConfig;

// ================================================================================================
// Registry and Building
// ================================================================================================

/// Name and type directory, and the handle of one registered file
pub use crate::registry::{FileHandle, Registry};

/// Raw bytes, type table and dependency indexes of a lazily built file
pub use crate::builder::FileBuilder;

// ================================================================================================
// Descriptor Tree
// ================================================================================================

/// Node types and their shared reference aliases
pub use crate::descriptor::{
    Descriptor, DescriptorRef, EnumDescriptor, EnumRc, EnumValueDescriptor, FieldDescriptor,
    FieldRc, FileDescriptor, FileRc, MessageDescriptor, MessageRc, MethodDescriptor,
    OneofDescriptor, ServiceDescriptor,
};

/// Value kinds, cardinality, syntax and runtime type identity
pub use crate::descriptor::{Cardinality, DefaultValue, Kind, Syntax, TypeHandle, TypeRef};

// ================================================================================================
// Conversion and Legacy Types
// ================================================================================================

/// Conversion between descriptor trees and schema messages
pub use crate::convert::{from_proto, DescriptorResolver, ToProto};

/// Schema messages
pub use crate::proto::{FileDescriptorProto, SchemaMessage};

/// Legacy runtime type capabilities
pub use crate::legacy::{FieldMetadata, LegacyEnum, LegacyMessage, LegacyType, ValueShape};
