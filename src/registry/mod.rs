//! The descriptor registry.
//!
//! This module provides [`Registry`], the directory that generated code registers its files
//! and runtime types with, and that reflective code queries by file path, full name or
//! runtime type. It is an explicit object: the embedder constructs it, shares it (it is a
//! cheap `Clone` over shared state), and dropping the last clone tears everything down, so
//! tests can run against isolated registries.
//!
//! # Registry Architecture
//!
//! - **Files**: ordered by path in a lock-free `SkipMap`, each entry a [`FileHandle`] owning
//!   the exactly-once build of its tree
//! - **Names**: `DashMap` from every declared enum, message, extension and service name to
//!   the path of the declaring file, filled from the seed at registration time
//! - **Packages**: `DashMap` from package to the paths declaring into it, used to locate
//!   enum values, fields and methods of files that are not built yet
//! - **Types**: `DashMap`s from full name to [`TypeHandle`] and from runtime type identity to
//!   the bound descriptor
//! - **Extensions**: append-only `boxcar` lists per extended message
//!
//! # Lazy Building
//!
//! Registering raw bytes only scans names. The first lookup that needs a node of the file
//! (by name, by runtime type, or through [`FileHandle::descriptor`]) builds it, building its
//! dependencies first. Lookups that hit a failed build log the failure and report absence;
//! [`FileHandle::descriptor`] surfaces the error itself.
//!
//! # Thread Safety
//!
//! Every operation takes `&self` and is safe under concurrent invocation. Registrations
//! racing at start-up and lookups racing on a first build are the expected pattern.
//!
//! # Examples
//!
//! ```rust
//! use protolens::{FileBuilder, Registry};
//!
//! # let bytes = std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/samples/deprecated.pb")).unwrap();
//! let registry = Registry::new();
//! let handle = registry.register_raw_file(FileBuilder::new(bytes.clone()))?;
//! assert!(!handle.is_built());
//!
//! // registering the same bytes again is a no-op
//! registry.register_raw_file(FileBuilder::new(bytes))?;
//!
//! let message = registry
//!     .find_descriptor_by_name("goproto.protoc.comments.DeprecatedMessage")
//!     .unwrap();
//! assert!(message.as_message().is_some());
//! assert!(handle.is_built());
//! # Ok::<(), protolens::Error>(())
//! ```

mod entry;
mod graph;

pub use entry::FileHandle;
pub(crate) use graph::check_cycles;

use std::{any::TypeId, collections::HashSet, sync::Arc};

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};
use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    builder::FileBuilder,
    descriptor::{
        Descriptor, DescriptorRef, EnumRc, FieldRc, FileDescriptor, FileRc, MessageRc,
        TypeHandle, TypeRef,
    },
    legacy::{LegacyEngine, LegacyEnum, LegacyMessage},
    proto::{FileSeed, SchemaMessage},
    utils::{decompress::inflate, names::strip_leading_dot},
    validation::ValidationConfig,
    Error, Result,
};

/// State shared by all clones of a [`Registry`] and weakly by its file handles.
pub(crate) struct Shared {
    config: ValidationConfig,
    files: SkipMap<String, Arc<FileHandle>>,
    names: DashMap<String, String>,
    packages: DashMap<String, Vec<String>>,
    types: DashMap<String, TypeHandle>,
    by_handle: DashMap<TypeId, DescriptorRef>,
    pending_types: DashMap<TypeId, String>,
    extensions: DashMap<String, Arc<boxcar::Vec<FieldRc>>>,
    legacy_names: DashMap<String, DescriptorRef>,
    legacy: LegacyEngine,
}

/// Thread-safe directory of descriptor files and runtime type bindings.
#[derive(Clone)]
pub struct Registry {
    shared: Arc<Shared>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry using [`ValidationConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ValidationConfig::default())
    }

    /// Create an empty registry whose builds use `config`.
    #[must_use]
    pub fn with_config(config: ValidationConfig) -> Self {
        Registry {
            shared: Arc::new(Shared {
                config,
                files: SkipMap::new(),
                names: DashMap::new(),
                packages: DashMap::new(),
                types: DashMap::new(),
                by_handle: DashMap::new(),
                pending_types: DashMap::new(),
                extensions: DashMap::new(),
                legacy_names: DashMap::new(),
                legacy: LegacyEngine::new(),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Registry { shared }
    }

    /// The validation settings used by builds of this registry.
    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.shared.config
    }

    /// The legacy inference engine owned by this registry.
    #[must_use]
    pub fn legacy(&self) -> &LegacyEngine {
        &self.shared.legacy
    }

    /// Register a file by its raw bytes; the tree is built on first access.
    ///
    /// Only the names and imports of the file are read here. Registering the same path
    /// with the same bytes again returns the existing handle.
    ///
    /// # Errors
    /// - [`Error::Malformed`] if the bytes cannot be inflated or scanned, or the type handle
    ///   array does not have one entry per enum and non-map message
    /// - [`Error::NameConflict`] if the path is registered with different bytes, or a
    ///   declared name is owned by another file
    pub fn register_raw_file(&self, builder: FileBuilder) -> Result<Arc<FileHandle>> {
        let FileBuilder {
            bytes,
            types,
            dependency_indexes,
        } = builder;

        let bytes = inflate(&bytes)?.into_owned();
        let seed = FileSeed::scan(&bytes)?;
        if !types.is_empty() && types.len() != seed.type_slot_count() {
            return Err(malformed_error!(
                "{} declares {} types but {} type handles were supplied",
                seed.path,
                seed.type_slot_count(),
                types.len()
            ));
        }

        if let Some(existing) = self.find_file_by_path(&seed.path) {
            return Self::same_registration(existing, &bytes);
        }

        let handle = Arc::new(FileHandle::pending(
            seed,
            bytes,
            types,
            dependency_indexes,
            Arc::downgrade(&self.shared),
        ));
        self.insert_handle(handle)
    }

    /// Register an already built tree.
    ///
    /// Types bound on the tree's messages and enums are registered as well, and so are its
    /// extensions.
    ///
    /// # Errors
    /// Returns [`Error::NameConflict`] if the path is registered with a different tree, a
    /// declared name is owned by another file, or a bound type conflicts with an existing
    /// binding.
    pub fn register_file(&self, file: FileRc) -> Result<Arc<FileHandle>> {
        let bytes = if file.raw_bytes().is_empty() {
            crate::convert::ToProto::to_proto(file.as_ref()).encode_to_vec()
        } else {
            file.raw_bytes().to_vec()
        };

        if let Some(existing) = self.find_file_by_path(&file.path) {
            return Self::same_registration(existing, &bytes);
        }

        let seed = FileSeed::scan(&bytes)?;
        let handle = self.insert_handle(Arc::new(FileHandle::built(
            seed,
            bytes,
            file.clone(),
            Arc::downgrade(&self.shared),
        )))?;
        if let Err(error) = self.publish(&file, &[]) {
            self.remove_handle(&handle);
            return Err(error);
        }
        Ok(handle)
    }

    /// Undo [`Registry::insert_handle`] for a registration that failed afterwards.
    fn remove_handle(&self, handle: &Arc<FileHandle>) {
        let path = handle.path();
        match self.shared.files.get(path) {
            Some(entry) if Arc::ptr_eq(entry.value(), handle) => {
                entry.remove();
            }
            _ => return,
        }
        self.shared.names.retain(|_, owner| owner.as_str() != path);
        if let Some(mut paths) = self.shared.packages.get_mut(&handle.seed.package) {
            paths.retain(|registered| registered != path);
        }
        for ty in &handle.types {
            self.shared
                .pending_types
                .remove_if(&ty.id(), |_, registered| registered == path);
        }
        debug!("rolled back registration of {}", path);
    }

    fn same_registration(existing: Arc<FileHandle>, bytes: &[u8]) -> Result<Arc<FileHandle>> {
        if existing.bytes == bytes {
            debug!("{} already registered", existing.path());
            Ok(existing)
        } else {
            Err(Error::NameConflict(format!(
                "file {} is already registered with different content",
                existing.path()
            )))
        }
    }

    fn insert_handle(&self, handle: Arc<FileHandle>) -> Result<Arc<FileHandle>> {
        let path = handle.path().to_string();
        let mut claimed = Vec::new();
        for declaration in handle.seed.declarations() {
            if self.shared.legacy_names.contains_key(&declaration.full_name) {
                for name in &claimed {
                    self.shared.names.remove(name);
                }
                return Err(Error::NameConflict(format!(
                    "{} {} of {} is already declared by a legacy type",
                    declaration.kind, declaration.full_name, path
                )));
            }
            match self.shared.names.entry(declaration.full_name.clone()) {
                Entry::Occupied(owner) if owner.get() != &path => {
                    let owner = owner.get().clone();
                    for name in &claimed {
                        self.shared.names.remove(name);
                    }
                    return Err(Error::NameConflict(format!(
                        "{} {} of {} is already declared by {}",
                        declaration.kind, declaration.full_name, path, owner
                    )));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(path.clone());
                    claimed.push(declaration.full_name);
                }
            }
        }

        let entry = self.shared.files.get_or_insert(path.clone(), handle.clone());
        if !Arc::ptr_eq(entry.value(), &handle) {
            let existing = entry.value().clone();
            if existing.bytes != handle.bytes {
                for name in &claimed {
                    self.shared.names.remove(name);
                }
            }
            return Self::same_registration(existing, &handle.bytes);
        }

        {
            let mut paths = self
                .shared
                .packages
                .entry(handle.seed.package.clone())
                .or_default();
            if !paths.contains(&path) {
                paths.push(path.clone());
            }
        }
        for ty in &handle.types {
            self.shared.pending_types.insert(ty.id(), path.clone());
        }

        debug!(
            "registered {} ({} enums, {} messages, {} extensions)",
            path,
            handle.seed.enums.len(),
            handle.seed.messages.len(),
            handle.seed.extensions.len()
        );
        Ok(handle)
    }

    /// Record the runtime types and extensions of a built file.
    ///
    /// `types` are bound by position: enums in pre-order, then non-map messages in
    /// pre-order. Every binding is checked before any is made, so a conflict leaves both the
    /// tree and the registry untouched.
    pub(crate) fn publish(&self, file: &FileDescriptor, types: &[TypeHandle]) -> Result<()> {
        let declarations = file
            .all_enums()
            .iter()
            .map(|enumeration| DescriptorRef::Enum(enumeration.clone()))
            .chain(
                file.all_messages()
                    .iter()
                    .filter(|message| !message.is_map_entry)
                    .map(|message| DescriptorRef::Message(message.clone())),
            );

        let mut bindings = Vec::new();
        let mut seen = HashSet::new();
        for (index, declaration) in declarations.enumerate() {
            let bound = match &declaration {
                DescriptorRef::Enum(enumeration) => enumeration.runtime_type(),
                DescriptorRef::Message(message) => message.runtime_type(),
                _ => None,
            };
            let handle = match (bound, types.get(index).copied()) {
                (Some(bound), Some(supplied)) if bound != supplied => {
                    return Err(Error::NameConflict(format!(
                        "{} is bound to {}, cannot bind {}",
                        declaration.full_name(),
                        bound,
                        supplied
                    )));
                }
                (bound, supplied) => bound.or(supplied),
            };
            let Some(handle) = handle else { continue };
            if !seen.insert(handle.id()) {
                return Err(Error::NameConflict(format!(
                    "{} binds {} to more than one declaration",
                    file.path, handle
                )));
            }
            self.check_type(&declaration, handle)?;
            bindings.push((declaration, handle));
        }

        for (declaration, handle) in bindings {
            match &declaration {
                DescriptorRef::Enum(enumeration) => enumeration.bind_runtime_type(handle)?,
                DescriptorRef::Message(message) => message.bind_runtime_type(handle)?,
                _ => {}
            }
            self.insert_type(declaration, handle)?;
        }

        for extension in file.all_extensions() {
            let extendee = extension.extendee().map_or_else(
                || strip_leading_dot(extension.extendee_name.as_deref().unwrap_or_default()),
                TypeRef::full_name,
            );
            self.shared
                .extensions
                .entry(extendee.to_string())
                .or_default()
                .push(extension.clone());
        }
        Ok(())
    }

    /// Fails if binding `handle` to `declaration` would contradict an existing binding.
    fn check_type(&self, declaration: &DescriptorRef, handle: TypeHandle) -> Result<()> {
        let full_name = declaration.full_name();
        if let Some(existing) = self.shared.types.get(full_name) {
            if *existing != handle {
                return Err(Error::NameConflict(format!(
                    "{} is bound to {}, cannot bind {}",
                    full_name,
                    existing.value(),
                    handle
                )));
            }
        }
        if let Some(existing) = self.shared.by_handle.get(&handle.id()) {
            if !existing.ptr_eq(declaration) {
                return Err(Error::NameConflict(format!(
                    "{} is bound to {}, cannot bind it to {}",
                    handle,
                    existing.full_name(),
                    full_name
                )));
            }
        }
        if let Some(legacy) = self.shared.legacy_names.get(full_name) {
            if !legacy.ptr_eq(declaration) {
                return Err(Error::NameConflict(format!(
                    "{full_name} is already declared by a legacy type"
                )));
            }
        }
        Ok(())
    }

    fn insert_type(&self, declaration: DescriptorRef, handle: TypeHandle) -> Result<()> {
        self.check_type(&declaration, handle)?;
        let full_name = declaration.full_name().to_string();
        match self.shared.types.entry(full_name.clone()) {
            Entry::Occupied(existing) if *existing.get() != handle => {
                return Err(Error::NameConflict(format!(
                    "{} is bound to {}, cannot bind {}",
                    full_name,
                    existing.get(),
                    handle
                )));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(handle);
            }
        }
        self.shared.by_handle.insert(handle.id(), declaration);
        Ok(())
    }

    /// Bind a runtime type to the message or enum named `full_name`.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedReference`] if no message or enum has that name, and
    /// [`Error::NameConflict`] if either side is already bound differently.
    pub fn register_type(&self, full_name: &str, handle: TypeHandle) -> Result<()> {
        let declaration = self
            .find_descriptor_by_name(full_name)
            .ok_or_else(|| Error::UnresolvedReference(format!("no declaration named {full_name}")))?;
        if !matches!(declaration, DescriptorRef::Message(_) | DescriptorRef::Enum(_)) {
            return Err(Error::UnresolvedReference(format!(
                "{full_name} is not a message or enum"
            )));
        }
        self.check_type(&declaration, handle)?;
        match &declaration {
            DescriptorRef::Message(message) => message.bind_runtime_type(handle)?,
            DescriptorRef::Enum(enumeration) => enumeration.bind_runtime_type(handle)?,
            _ => {}
        }
        self.insert_type(declaration, handle)
    }

    /// Infer the descriptor of a legacy message type and register its binding.
    ///
    /// # Errors
    /// Returns the inference failure, or [`Error::NameConflict`] if the inferred name is
    /// already bound to another type.
    pub fn register_legacy_message<T: LegacyMessage>(&self) -> Result<MessageRc> {
        let message = self.shared.legacy.message::<T>()?;
        self.insert_legacy(DescriptorRef::Message(message.clone()), TypeHandle::of::<T>())?;
        Ok(message)
    }

    /// Infer the descriptor of a legacy enum type and register its binding.
    ///
    /// # Errors
    /// Returns the inference failure, or [`Error::NameConflict`] if the inferred name is
    /// already bound to another type.
    pub fn register_legacy_enum<T: LegacyEnum>(&self) -> Result<EnumRc> {
        let enumeration = self.shared.legacy.enumeration::<T>()?;
        self.insert_legacy(
            DescriptorRef::Enum(enumeration.clone()),
            TypeHandle::of::<T>(),
        )?;
        Ok(enumeration)
    }

    fn insert_legacy(&self, declaration: DescriptorRef, handle: TypeHandle) -> Result<()> {
        let full_name = declaration.full_name().to_string();
        if let Some(path) = self.shared.names.get(&full_name) {
            return Err(Error::NameConflict(format!(
                "{} is already declared by {}",
                full_name,
                path.value()
            )));
        }
        self.insert_type(declaration.clone(), handle)?;
        self.shared.legacy_names.insert(full_name, declaration);
        Ok(())
    }

    /// The handle of the file registered under `path`.
    #[must_use]
    pub fn find_file_by_path(&self, path: &str) -> Option<Arc<FileHandle>> {
        self.shared
            .files
            .get(path)
            .map(|entry| entry.value().clone())
    }

    /// The built tree of the file registered under `path`, building it if needed.
    ///
    /// A failed build is logged and reported as `None`.
    #[must_use]
    pub fn find_file_descriptor(&self, path: &str) -> Option<FileRc> {
        let handle = self.find_file_by_path(path)?;
        Self::descriptor_or_log(&handle)
    }

    fn descriptor_or_log(handle: &FileHandle) -> Option<FileRc> {
        match handle.descriptor() {
            Ok(file) => Some(file),
            Err(error) => {
                warn!("lookup skipped {}: {}", handle.path(), error);
                None
            }
        }
    }

    /// Find any declaration (message, field, oneof, enum, enum value, extension, service or
    /// method) by its full name, building the declaring file if needed.
    #[must_use]
    pub fn find_descriptor_by_name(&self, full_name: &str) -> Option<DescriptorRef> {
        let full_name = strip_leading_dot(full_name);
        if let Some(found) = self.find_in_owner(full_name, full_name) {
            return Some(found);
        }
        if let Some(found) = self.shared.legacy_names.get(full_name) {
            return Some(found.value().clone());
        }

        // Fields, oneofs, methods and enum values are not in the seed; find the file from
        // the closest declared enclosing name or package.
        let mut candidate = full_name;
        loop {
            let prefix = candidate.rsplit_once('.').map_or("", |(prefix, _)| prefix);
            if let Some(found) = self.find_in_owner(prefix, full_name) {
                return Some(found);
            }
            if let Some(found) = self.find_in_package(prefix, full_name) {
                return Some(found);
            }
            if prefix.is_empty() {
                return None;
            }
            candidate = prefix;
        }
    }

    fn find_in_owner(&self, owner: &str, full_name: &str) -> Option<DescriptorRef> {
        let path = self.shared.names.get(owner)?.value().clone();
        let file = self.find_file_descriptor(&path)?;
        file.find_by_name(full_name)
    }

    fn find_in_package(&self, package: &str, full_name: &str) -> Option<DescriptorRef> {
        let paths = self.shared.packages.get(package)?.value().clone();
        paths
            .iter()
            .filter_map(|path| self.find_file_descriptor(path))
            .find_map(|file| file.find_by_name(full_name))
    }

    /// The runtime type bound to the message or enum named `full_name`.
    #[must_use]
    pub fn find_type_by_name(&self, full_name: &str) -> Option<TypeHandle> {
        let full_name = strip_leading_dot(full_name);
        if let Some(handle) = self.shared.types.get(full_name) {
            return Some(*handle);
        }
        let path = self.shared.names.get(full_name)?.value().clone();
        self.find_file_descriptor(&path)?;
        self.shared.types.get(full_name).map(|handle| *handle)
    }

    /// The descriptor bound to a runtime type.
    #[must_use]
    pub fn find_type_by_handle(&self, handle: TypeHandle) -> Option<DescriptorRef> {
        if let Some(found) = self.shared.by_handle.get(&handle.id()) {
            return Some(found.value().clone());
        }
        let path = self.shared.pending_types.get(&handle.id())?.value().clone();
        self.find_file_descriptor(&path)?;
        self.shared
            .by_handle
            .get(&handle.id())
            .map(|found| found.value().clone())
    }

    /// Find the extension of `extendee` with field number `number`.
    ///
    /// Files declaring extensions are built first if they are still pending.
    #[must_use]
    pub fn find_extension_by_number(&self, extendee: &str, number: i32) -> Option<FieldRc> {
        let extendee = strip_leading_dot(extendee);
        for entry in &self.shared.files {
            let handle = entry.value();
            if !handle.is_built() && !handle.seed.extensions.is_empty() {
                Self::descriptor_or_log(handle);
            }
        }
        let extensions = self.shared.extensions.get(extendee)?.value().clone();
        extensions
            .iter()
            .map(|(_, extension)| extension)
            .find(|extension| extension.number == number)
            .cloned()
    }

    /// Paths of all registered files, in order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.shared
            .files
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of registered files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.files.len()
    }

    /// Returns `true` if no file is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.files.is_empty()
    }

    /// Build every pending file in parallel.
    ///
    /// Returns the paths of files whose build failed, with the failure.
    pub fn build_all(&self) -> Vec<(String, Error)> {
        let handles: Vec<Arc<FileHandle>> = self
            .shared
            .files
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let failures: Vec<(String, Error)> = handles
            .par_iter()
            .filter_map(|handle| {
                handle
                    .descriptor()
                    .err()
                    .map(|error| (handle.path().to_string(), error))
            })
            .collect();

        debug!(
            "built {} files, {} failed",
            handles.len(),
            failures.len()
        );
        failures
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("files", &self.shared.files.len())
            .field("names", &self.shared.names.len())
            .field("types", &self.shared.types.len())
            .finish_non_exhaustive()
    }
}
