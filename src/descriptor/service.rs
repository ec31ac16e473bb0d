//! Service and method declarations.
//!
//! Services are carried through for completeness; the only references they hold are the
//! method input and output messages, resolved like field references.

use std::sync::{Arc, OnceLock};

use crate::{
    descriptor::{MessageRc, MethodRc, Parent, Syntax, TypeRef},
    proto::RawOptions,
};

/// A service.
#[derive(Debug)]
pub struct ServiceDescriptor {
    /// Fully qualified name
    pub full_name: String,
    /// Local name
    pub name: String,
    /// Position within the file
    pub index: usize,
    /// Syntax of the declaring file
    pub syntax: Syntax,
    pub(crate) parent: OnceLock<Parent>,
    /// Methods in declaration order
    pub methods: Vec<MethodRc>,
    /// `deprecated` option
    pub deprecated: bool,
    /// Raw `ServiceOptions`
    pub options: Option<RawOptions>,
}

impl_descriptor!(ServiceDescriptor);

impl ServiceDescriptor {
    /// Look up a method by name.
    #[must_use]
    pub fn method_by_name(&self, name: &str) -> Option<&MethodRc> {
        self.methods.iter().find(|method| method.name == name)
    }

    pub(crate) fn set_parent(&self, parent: Parent) {
        let _ = self.parent.set(parent);
    }

    pub(crate) fn adopt_children(self: &Arc<Self>) {
        let parent = Parent::Service(Arc::downgrade(self));
        for method in &self.methods {
            method.set_parent(parent.clone());
        }
    }
}

/// A method of a service.
#[derive(Debug)]
pub struct MethodDescriptor {
    /// Fully qualified name
    pub full_name: String,
    /// Local name
    pub name: String,
    /// Position within the service
    pub index: usize,
    /// Syntax of the declaring file
    pub syntax: Syntax,
    pub(crate) parent: OnceLock<Parent>,
    /// Input type name as stored
    pub input_name: String,
    /// Output type name as stored
    pub output_name: String,
    /// The client sends a stream of messages
    pub client_streaming: bool,
    /// The server sends a stream of messages
    pub server_streaming: bool,
    /// `deprecated` option
    pub deprecated: bool,
    /// Raw `MethodOptions`
    pub options: Option<RawOptions>,
    pub(crate) input: OnceLock<TypeRef>,
    pub(crate) output: OnceLock<TypeRef>,
}

impl_descriptor!(MethodDescriptor);

impl MethodDescriptor {
    /// The resolved input message reference.
    #[must_use]
    pub fn input(&self) -> Option<&TypeRef> {
        self.input.get()
    }

    /// The resolved output message reference.
    #[must_use]
    pub fn output(&self) -> Option<&TypeRef> {
        self.output.get()
    }

    /// The input message, if resolved and alive.
    #[must_use]
    pub fn input_type(&self) -> Option<MessageRc> {
        self.input.get().and_then(TypeRef::upgrade_message)
    }

    /// The output message, if resolved and alive.
    #[must_use]
    pub fn output_type(&self) -> Option<MessageRc> {
        self.output.get().and_then(TypeRef::upgrade_message)
    }

    pub(crate) fn set_parent(&self, parent: Parent) {
        let _ = self.parent.set(parent);
    }
}
