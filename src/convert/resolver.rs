//! Name resolution for type references.
//!
//! References stored in schema bytes are either fully qualified (`.pkg.Message`) or
//! relative to the scope they appear in. Relative names are looked up from the innermost
//! enclosing scope outwards, the way the schema compiler does it.

use std::collections::HashSet;

use log::trace;

use crate::{
    descriptor::{DescriptorRef, FileDescriptor, FileRc, ReferenceSlot},
    registry::Registry,
    utils::names::join_name,
    Error, Result,
};

/// Source of dependency files for [`crate::convert::from_proto`].
///
/// Implemented by the [`Registry`] (building files on demand) and by plain slices of
/// already built files.
pub trait DescriptorResolver {
    /// The built file registered under `path`.
    fn resolve_file(&self, path: &str) -> Option<FileRc>;
}

impl DescriptorResolver for Registry {
    fn resolve_file(&self, path: &str) -> Option<FileRc> {
        self.find_file_descriptor(path)
    }
}

impl DescriptorResolver for [FileRc] {
    fn resolve_file(&self, path: &str) -> Option<FileRc> {
        self.iter().find(|file| file.path == path).cloned()
    }
}

impl DescriptorResolver for Vec<FileRc> {
    fn resolve_file(&self, path: &str) -> Option<FileRc> {
        self.as_slice().resolve_file(path)
    }
}

impl<R: DescriptorResolver + ?Sized> DescriptorResolver for &R {
    fn resolve_file(&self, path: &str) -> Option<FileRc> {
        (**self).resolve_file(path)
    }
}

/// The direct imports plus everything they re-export through public imports.
pub(crate) fn visible_files<I, F>(direct: I, resolve: F) -> Vec<FileRc>
where
    I: IntoIterator<Item = FileRc>,
    F: Fn(&str) -> Option<FileRc>,
{
    let mut seen = HashSet::new();
    let mut visible = Vec::new();
    let mut queue: Vec<FileRc> = direct.into_iter().collect();
    queue.reverse();

    while let Some(file) = queue.pop() {
        if !seen.insert(file.path.clone()) {
            continue;
        }
        for path in file.public_imports() {
            if let Some(public) = resolve(path) {
                queue.push(public);
            }
        }
        visible.push(file);
    }
    visible
}

/// Resolve `name` as written inside `scope`.
///
/// Fully qualified names are looked up directly. Otherwise the scopes from `scope` out to
/// the root are tried in turn; once the first component of the name matches a message or
/// enum in some scope, the rest must resolve from there.
pub(crate) fn resolve_scoped<F>(scope: &str, name: &str, lookup: F) -> Option<DescriptorRef>
where
    F: Fn(&str) -> Option<DescriptorRef>,
{
    if let Some(qualified) = name.strip_prefix('.') {
        return lookup(qualified).filter(is_type);
    }

    let first = name.split('.').next().unwrap_or(name);
    let mut current = scope;
    loop {
        let anchor = join_name(current, first);
        if lookup(&anchor).is_some_and(|found| is_type(&found)) {
            return lookup(&join_name(current, name)).filter(is_type);
        }
        if current.is_empty() {
            return None;
        }
        current = current.rsplit_once('.').map_or("", |(parent, _)| parent);
    }
}

fn is_type(found: &DescriptorRef) -> bool {
    matches!(found, DescriptorRef::Message(_) | DescriptorRef::Enum(_))
}

/// Bind every reference slot of `file` by name against the file and `visible` imports.
///
/// # Errors
/// Returns [`Error::UnresolvedReference`] for a name that matches nothing, and
/// [`Error::Malformed`] for a typed field or method that carries no name.
pub(crate) fn link_by_name(file: &FileDescriptor, visible: &[FileRc]) -> Result<()> {
    let lookup = |full_name: &str| {
        file.find_by_name(full_name)
            .or_else(|| visible.iter().find_map(|import| import.find_by_name(full_name)))
    };

    for slot in ReferenceSlot::collect(file) {
        let name = slot
            .stored_name()
            .ok_or_else(|| malformed_error!("{} has no type name", slot.owner()))?;
        let target = resolve_scoped(slot.scope(), name, lookup).ok_or_else(|| {
            Error::UnresolvedReference(format!(
                "{} referenced by {} in {}",
                name,
                slot.owner(),
                file.path
            ))
        })?;
        trace!("{} -> {}", slot.owner(), name);
        slot.bind(&target)?;
    }
    Ok(())
}
