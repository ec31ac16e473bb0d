//! Oneof declarations.

use std::sync::OnceLock;

use crate::{
    descriptor::{Descriptor, DescriptorRef, FieldRc, Parent, Syntax},
    proto::RawOptions,
};

/// A set of fields of which at most one is populated.
///
/// The member fields are owned by the message; the oneof records their positions.
#[derive(Debug)]
pub struct OneofDescriptor {
    /// Fully qualified name
    pub full_name: String,
    /// Local name
    pub name: String,
    /// Position within the message
    pub index: usize,
    /// Syntax of the declaring file
    pub syntax: Syntax,
    pub(crate) parent: OnceLock<Parent>,
    /// Positions of the member fields in the message's field list
    pub field_indices: Vec<usize>,
    /// Raw `OneofOptions`
    pub options: Option<RawOptions>,
}

impl_descriptor!(OneofDescriptor);

impl OneofDescriptor {
    /// The member fields, in declaration order.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldRc> {
        match self.parent() {
            Some(DescriptorRef::Message(message)) => self
                .field_indices
                .iter()
                .filter_map(|&index| message.fields.get(index).cloned())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns `true` if the oneof only exists to track presence of a proto3 `optional`
    /// field.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        let fields = self.fields();
        fields.len() == 1 && fields[0].is_proto3_optional()
    }

    pub(crate) fn set_parent(&self, parent: Parent) {
        let _ = self.parent.set(parent);
    }
}
