//! Lazy construction of file trees from generated-code inputs.
//!
//! Generated code hands the registry three things per file: the encoded descriptor bytes,
//! the runtime type handles of the file's declarations, and a dependency-index table that
//! links every type reference to a declaration without name lookups. [`FileBuilder`]
//! collects them; the registry stores them and runs [`build`] on first access.
//!
//! # Symbol Space
//!
//! Dependency indexes point into the declarations of the file followed by those of each
//! import in declaration order. Each file contributes its enums (top-level first, then per
//! message in pre-order) followed by its messages in pre-order, map entries included.
//!
//! # Reference Layout
//!
//! The table holds one entry per message, enum or group typed field (messages in pre-order,
//! fields in declaration order), then per extension (top-level first, then per message in
//! pre-order) one entry for the extended message and one for the type if it is a message or
//! enum, then input and output of every method. An empty table resolves references by the
//! type names stored in the bytes instead.

mod link;

pub(crate) use link::build;

use crate::descriptor::TypeHandle;

/// Inputs for registering one file.
///
/// # Examples
///
/// ```rust
/// use protolens::{FileBuilder, Registry, TypeHandle};
///
/// struct DeprecatedEnum;
/// struct DeprecatedMessage;
///
/// # let bytes = std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/samples/deprecated.pb"))?;
/// let registry = Registry::new();
/// registry.register_raw_file(
///     FileBuilder::new(bytes)
///         .types(&[TypeHandle::of::<DeprecatedEnum>(), TypeHandle::of::<DeprecatedMessage>()]),
/// )?;
///
/// let handle = registry
///     .find_type_by_name("goproto.protoc.comments.DeprecatedMessage")
///     .unwrap();
/// assert_eq!(handle, TypeHandle::of::<DeprecatedMessage>());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct FileBuilder {
    pub(crate) bytes: Vec<u8>,
    pub(crate) types: Vec<TypeHandle>,
    pub(crate) dependency_indexes: Vec<u32>,
}

impl FileBuilder {
    /// Start from encoded descriptor bytes, optionally gzip compressed.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        FileBuilder {
            bytes: bytes.into(),
            ..Default::default()
        }
    }

    /// Runtime type handles: one per enum, then one per non-map message, both in pre-order.
    #[must_use]
    pub fn types(mut self, types: &[TypeHandle]) -> Self {
        self.types = types.to_vec();
        self
    }

    /// Dependency-index table linking each type reference into the symbol space.
    #[must_use]
    pub fn dependency_indexes(mut self, indexes: &[u32]) -> Self {
        self.dependency_indexes = indexes.to_vec();
        self
    }

    /// The bytes as supplied.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
