//! Descriptor inference for legacy runtime types.
//!
//! Some generated types predate embedded descriptor bytes: all they carry is their runtime
//! name, where they are nested, and a metadata string per field. This module rebuilds
//! equivalent descriptor trees from that information.
//!
//! # Key Components
//!
//! - [`LegacyMessage`], [`LegacyEnum`] - capabilities a legacy runtime type provides
//! - [`FieldMetadata`], [`ValueShape`] - per-field metadata string and runtime value shape
//! - [`LegacyType`] - type-erased handle to a legacy message or enum type
//! - [`LegacyEngine`] - memoizing inference, exactly once per runtime type
//!
//! # Inference Rules
//!
//! - Full names come from the package of the outermost type and the enclosing-type chain;
//!   a runtime name `Outer_Inner` enclosed by `Outer` is declared as `Inner`
//! - Field kinds follow from the wire category of the metadata string together with the
//!   runtime value shape
//! - Map fields get a synthetic nested `<CamelName>Entry` message with `key = 1` and
//!   `value = 2`, which is never bound to a runtime type
//! - Group fields default to the lower-cased name of their message
//! - A message is proto3 when any of its field strings says so
//! - Enum values are ordered by number, then name
//!
//! Recursive and mutually recursive types are supported: every type reachable from the
//! requested one is built as a skeleton first and linked afterwards, and only linked trees
//! are published.
//!
//! # Examples
//!
//! ```rust
//! use protolens::legacy::{FieldMetadata, LegacyEngine, LegacyMessage, ValueShape};
//! use protolens::descriptor::{Cardinality, Kind};
//!
//! struct Ping;
//!
//! impl LegacyMessage for Ping {
//!     fn runtime_name() -> &'static str {
//!         "Ping"
//!     }
//!
//!     fn package() -> Option<&'static str> {
//!         Some("net")
//!     }
//!
//!     fn fields() -> Vec<FieldMetadata> {
//!         vec![FieldMetadata::new("Foo", "varint,1,opt,name=foo", ValueShape::I32)]
//!     }
//! }
//!
//! let engine = LegacyEngine::new();
//! let ping = engine.message::<Ping>()?;
//! assert_eq!(ping.full_name, "net.Ping");
//!
//! let foo = &ping.fields[0];
//! assert_eq!((foo.name.as_str(), foo.number), ("foo", 1));
//! assert_eq!(foo.kind, Kind::Int32);
//! assert_eq!(foo.cardinality, Cardinality::Optional);
//! # Ok::<(), protolens::Error>(())
//! ```

mod infer;
mod tag;

use std::{
    any::TypeId,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, OnceLock, PoisonError,
    },
};

use dashmap::DashMap;
use log::debug;

use crate::{
    descriptor::{DescriptorRef, EnumRc, MessageRc, TypeHandle},
    Error, Result,
};

/// A legacy generated message type.
pub trait LegacyMessage: 'static {
    /// Name of the runtime type, e.g. `Outer_Inner` for a nested message.
    fn runtime_name() -> &'static str;

    /// Package of the schema file, if the generator recorded it.
    fn package() -> Option<&'static str> {
        None
    }

    /// The type this one is nested in.
    fn enclosing_type() -> Option<LegacyType> {
        None
    }

    /// Metadata of every field, in declaration order.
    fn fields() -> Vec<FieldMetadata>;

    /// Names of the oneofs, in declaration order.
    fn oneof_names() -> Vec<&'static str> {
        Vec::new()
    }
}

/// A legacy generated enum type.
pub trait LegacyEnum: 'static {
    /// Name of the runtime type.
    fn runtime_name() -> &'static str;

    /// Package of the schema file, if the generator recorded it.
    fn package() -> Option<&'static str> {
        None
    }

    /// The type this one is nested in.
    fn enclosing_type() -> Option<LegacyType> {
        None
    }

    /// Name and number of every value.
    fn values() -> Vec<(&'static str, i32)>;
}

#[derive(Clone, Copy, Debug)]
enum LegacyKind {
    Message {
        fields: fn() -> Vec<FieldMetadata>,
        oneofs: fn() -> Vec<&'static str>,
    },
    Enum {
        values: fn() -> Vec<(&'static str, i32)>,
    },
}

/// Type-erased handle to a [`LegacyMessage`] or [`LegacyEnum`] implementation.
#[derive(Clone, Copy, Debug)]
pub struct LegacyType {
    handle: TypeHandle,
    kind: LegacyKind,
    runtime_name: fn() -> &'static str,
    package: fn() -> Option<&'static str>,
    enclosing: fn() -> Option<LegacyType>,
}

impl LegacyType {
    /// Handle of a legacy message type.
    #[must_use]
    pub fn message<T: LegacyMessage>() -> Self {
        LegacyType {
            handle: TypeHandle::of::<T>(),
            kind: LegacyKind::Message {
                fields: T::fields,
                oneofs: T::oneof_names,
            },
            runtime_name: T::runtime_name,
            package: T::package,
            enclosing: T::enclosing_type,
        }
    }

    /// Handle of a legacy enum type.
    #[must_use]
    pub fn enumeration<T: LegacyEnum>() -> Self {
        LegacyType {
            handle: TypeHandle::of::<T>(),
            kind: LegacyKind::Enum { values: T::values },
            runtime_name: T::runtime_name,
            package: T::package,
            enclosing: T::enclosing_type,
        }
    }

    /// The runtime type identity.
    #[must_use]
    pub fn handle(&self) -> TypeHandle {
        self.handle
    }

    /// Returns `true` for message types.
    #[must_use]
    pub fn is_message(&self) -> bool {
        matches!(self.kind, LegacyKind::Message { .. })
    }

    /// Name of the runtime type.
    #[must_use]
    pub fn runtime_name(&self) -> &'static str {
        (self.runtime_name)()
    }
}

/// Shape of the runtime value of a field (of one element, for repeated fields).
#[derive(Clone, Debug)]
pub enum ValueShape {
    /// `bool`
    Bool,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// UTF-8 string
    String,
    /// Byte string
    Bytes,
    /// A legacy enum
    Enum(LegacyType),
    /// A legacy message
    Message(LegacyType),
    /// A map; key and value carry their own metadata strings
    Map {
        /// Metadata of the key
        key: Box<FieldMetadata>,
        /// Metadata of the value
        value: Box<FieldMetadata>,
    },
}

/// Metadata of one field of a legacy message.
#[derive(Clone, Debug)]
pub struct FieldMetadata {
    /// Name of the member holding the field
    pub member: &'static str,
    /// The metadata string
    pub tag: &'static str,
    /// Runtime value shape
    pub shape: ValueShape,
    /// Name of the oneof the field belongs to
    pub oneof: Option<&'static str>,
}

impl FieldMetadata {
    /// Metadata of a plain field.
    #[must_use]
    pub fn new(member: &'static str, tag: &'static str, shape: ValueShape) -> Self {
        FieldMetadata {
            member,
            tag,
            shape,
            oneof: None,
        }
    }

    /// Metadata of a map field.
    #[must_use]
    pub fn map(member: &'static str, tag: &'static str, key: FieldMetadata, value: FieldMetadata) -> Self {
        Self::new(
            member,
            tag,
            ValueShape::Map {
                key: Box::new(key),
                value: Box::new(value),
            },
        )
    }

    /// Place the field in the oneof called `name`.
    #[must_use]
    pub fn in_oneof(mut self, name: &'static str) -> Self {
        self.oneof = Some(name);
        self
    }
}

/// Memoizing descriptor inference for legacy types.
///
/// Results (descriptors and failures alike) are cached per runtime type for the lifetime of
/// the engine. Callers racing on the same type wait for the one in-flight run; runs for
/// unrelated types proceed in parallel. A run only publishes if none of the types it built
/// were published meanwhile, otherwise it starts over from the cache, so every runtime type
/// maps to exactly one descriptor node.
pub struct LegacyEngine {
    memo: DashMap<TypeId, Result<DescriptorRef>>,
    inflight: DashMap<TypeId, Arc<OnceLock<()>>>,
    commit: Mutex<()>,
    inferred: AtomicUsize,
}

impl Default for LegacyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyEngine {
    /// Create an engine with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        LegacyEngine {
            memo: DashMap::new(),
            inflight: DashMap::new(),
            commit: Mutex::new(()),
            inferred: AtomicUsize::new(0),
        }
    }

    /// The descriptor of legacy message `T`.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedLegacyShape`] if the metadata of `T` (or of a type it
    /// references) cannot be interpreted; the failure is cached.
    pub fn message<T: LegacyMessage>(&self) -> Result<MessageRc> {
        match self.infer(LegacyType::message::<T>())? {
            DescriptorRef::Message(message) => Ok(message),
            other => Err(Error::UnsupportedLegacyShape(format!(
                "{} inferred as {:?}",
                T::runtime_name(),
                other
            ))),
        }
    }

    /// The descriptor of legacy enum `T`.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedLegacyShape`] if the enum cannot be described; the failure
    /// is cached.
    pub fn enumeration<T: LegacyEnum>(&self) -> Result<EnumRc> {
        match self.infer(LegacyType::enumeration::<T>())? {
            DescriptorRef::Enum(enumeration) => Ok(enumeration),
            other => Err(Error::UnsupportedLegacyShape(format!(
                "{} inferred as {:?}",
                T::runtime_name(),
                other
            ))),
        }
    }

    /// The descriptor of a legacy type, inferring it and everything it references if needed.
    ///
    /// # Errors
    /// See [`LegacyEngine::message`].
    pub fn infer(&self, ty: LegacyType) -> Result<DescriptorRef> {
        let id = ty.handle().id();
        if let Some(done) = self.memo.get(&id) {
            return done.value().clone();
        }

        let gate = self.inflight.entry(id).or_default().clone();
        gate.get_or_init(|| self.run(ty));
        self.inflight.remove(&id);

        self.memo.get(&id).map_or_else(
            || {
                Err(Error::UnsupportedLegacyShape(format!(
                    "{} was not inferred",
                    ty.runtime_name()
                )))
            },
            |done| done.value().clone(),
        )
    }

    fn run(&self, ty: LegacyType) {
        let id = ty.handle().id();
        loop {
            if self.memo.contains_key(&id) {
                return;
            }
            debug!("inferring legacy type {}", ty.runtime_name());
            let results = infer::Session::new(&self.memo).run(ty);

            let _commit = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
            if self.memo.contains_key(&id) {
                return;
            }
            if let Some(raced) = results.keys().find(|key| self.memo.contains_key(key)) {
                debug!(
                    "{}: {:?} was published by a concurrent run, inferring again",
                    ty.runtime_name(),
                    raced
                );
                continue;
            }
            self.inferred.fetch_add(results.len(), Ordering::SeqCst);
            for (key, result) in results {
                self.memo.insert(key, result);
            }
            return;
        }
    }

    /// Number of types inferred so far, failures included.
    #[must_use]
    pub fn inferred_count(&self) -> usize {
        self.inferred.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for LegacyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyEngine")
            .field("cached", &self.memo.len())
            .finish_non_exhaustive()
    }
}
