//! File descriptors, the roots of the descriptor tree.

use std::{collections::HashMap, sync::Arc};

use crate::{
    descriptor::{
        Descriptor, DescriptorRef, EnumRc, FieldRc, MessageRc, Parent, ServiceRc, Syntax,
    },
    proto::RawOptions,
};

/// Everything declared by one schema file.
pub struct FileDescriptor {
    /// Path of the file relative to its import root
    pub path: String,
    /// Package, empty if none
    pub package: String,
    /// Syntax the file is written in
    pub syntax: Syntax,
    /// Paths of imported files in declaration order
    pub dependencies: Vec<String>,
    /// Indexes into `dependencies` of public imports
    pub public_dependencies: Vec<usize>,
    /// Indexes into `dependencies` of weak imports
    pub weak_dependencies: Vec<usize>,
    /// Top-level messages
    pub messages: Vec<MessageRc>,
    /// Top-level enums
    pub enums: Vec<EnumRc>,
    /// Top-level extensions
    pub extensions: Vec<FieldRc>,
    /// Services
    pub services: Vec<ServiceRc>,
    /// Raw `FileOptions`
    pub options: Option<RawOptions>,
    /// `deprecated` option
    pub deprecated: bool,
    pub(crate) raw: Vec<u8>,
    pub(crate) declarations: HashMap<String, DescriptorRef>,
    pub(crate) all_enums: Vec<EnumRc>,
    pub(crate) all_messages: Vec<MessageRc>,
    pub(crate) all_extensions: Vec<FieldRc>,
}

impl Descriptor for FileDescriptor {
    /// The package of the file.
    fn full_name(&self) -> &str {
        &self.package
    }

    /// The path of the file.
    fn name(&self) -> &str {
        &self.path
    }

    fn index(&self) -> usize {
        0
    }

    fn parent(&self) -> Option<DescriptorRef> {
        None
    }

    fn syntax(&self) -> Syntax {
        self.syntax
    }

    fn options(&self) -> Option<&RawOptions> {
        self.options.as_ref()
    }

    fn parent_file(&self) -> Option<Arc<FileDescriptor>> {
        None
    }
}

impl FileDescriptor {
    /// The canonical, uncompressed schema bytes the file was built from.
    #[must_use]
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Look up any declaration of this file by full name (messages, fields, oneofs, enums,
    /// enum values, extensions, services, methods).
    #[must_use]
    pub fn find_by_name(&self, full_name: &str) -> Option<DescriptorRef> {
        self.declarations.get(full_name).cloned()
    }

    /// Full names of every declaration of this file.
    pub fn declaration_names(&self) -> impl Iterator<Item = &str> {
        self.declarations.keys().map(String::as_str)
    }

    /// Look up a top-level message by local name.
    #[must_use]
    pub fn message_by_name(&self, name: &str) -> Option<&MessageRc> {
        self.messages.iter().find(|message| message.name == name)
    }

    /// Look up a top-level enum by local name.
    #[must_use]
    pub fn enum_by_name(&self, name: &str) -> Option<&EnumRc> {
        self.enums.iter().find(|enumeration| enumeration.name == name)
    }

    /// Look up a service by local name.
    #[must_use]
    pub fn service_by_name(&self, name: &str) -> Option<&ServiceRc> {
        self.services.iter().find(|service| service.name == name)
    }

    /// Every enum of the file: top-level first, then per message in pre-order.
    #[must_use]
    pub fn all_enums(&self) -> &[EnumRc] {
        &self.all_enums
    }

    /// Every message of the file in pre-order, map entries included.
    #[must_use]
    pub fn all_messages(&self) -> &[MessageRc] {
        &self.all_messages
    }

    /// Every extension of the file: top-level first, then per message in pre-order.
    #[must_use]
    pub fn all_extensions(&self) -> &[FieldRc] {
        &self.all_extensions
    }

    /// Paths of the public imports.
    pub fn public_imports(&self) -> impl Iterator<Item = &str> {
        self.public_dependencies
            .iter()
            .filter_map(|&index| self.dependencies.get(index).map(String::as_str))
    }

    pub(crate) fn adopt_children(self: &Arc<Self>) {
        let parent = Parent::File(Arc::downgrade(self));
        for message in &self.messages {
            message.set_parent(parent.clone());
        }
        for enumeration in &self.enums {
            enumeration.set_parent(parent.clone());
        }
        for extension in &self.extensions {
            extension.set_parent(parent.clone());
        }
        for service in &self.services {
            service.set_parent(parent.clone());
        }
    }
}

impl std::fmt::Debug for FileDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDescriptor")
            .field("path", &self.path)
            .field("package", &self.package)
            .field("syntax", &self.syntax)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
