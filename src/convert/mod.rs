//! Conversion between descriptor trees and schema messages.
//!
//! [`ToProto`] turns any node back into its schema message, preserving field order,
//! explicit defaults and options verbatim. [`from_proto`] goes the other way with full
//! semantic validation, resolving imports through a [`DescriptorResolver`]. Both directions
//! share the node constructor with the lazy file builder, so converted and decoded trees are
//! indistinguishable through the descriptor API.
//!
//! # Examples
//!
//! ```rust
//! use protolens::convert::{from_proto, ToProto};
//! use protolens::descriptor::FileRc;
//! use protolens::proto::{FileDescriptorProto, SchemaMessage};
//!
//! # let bytes = std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/samples/deprecated.pb")).unwrap();
//! let proto = FileDescriptorProto::decode(&bytes)?;
//! let file = from_proto(&proto, &Vec::<FileRc>::new())?;
//! assert_eq!(file.to_proto(), proto);
//! # Ok::<(), protolens::Error>(())
//! ```

mod from_proto;
mod resolver;
mod to_proto;

pub use from_proto::{from_proto, from_proto_with_config};
pub use resolver::DescriptorResolver;
pub(crate) use resolver::{link_by_name, visible_files};

/// Conversion of a descriptor node to its schema message.
pub trait ToProto {
    /// The schema message type produced.
    type Proto;

    /// Build the schema message describing this node.
    fn to_proto(&self) -> Self::Proto;
}
