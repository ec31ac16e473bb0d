use log::{debug, trace};

use crate::{
    convert::{link_by_name, visible_files},
    descriptor::{build_file, Descriptor, DescriptorRef, FileDescriptor, FileRc, ReferenceSlot},
    proto::{FileDescriptorProto, SchemaMessage},
    registry::{check_cycles, FileHandle, Registry},
    utils::names::strip_leading_dot,
    validation::{validate_file, ValidationConfig},
    Error, Result,
};

/// Build, link, validate and publish the tree of a registered file.
///
/// Dependencies are built first, through their own handles. Runs at most once per handle.
pub(crate) fn build(registry: &Registry, handle: &FileHandle) -> Result<FileRc> {
    let path = handle.path();
    debug!("building {}", path);

    check_cycles(registry, path)?;

    let proto = FileDescriptorProto::decode(&handle.bytes)?;
    let config = registry.config();
    let file = build_file(&proto, handle.bytes.clone(), config)?;
    let dependencies = build_dependencies(registry, &file)?;

    if handle.dependency_indexes.is_empty() {
        let visible = visible_files(dependencies.iter().flatten().cloned(), |path| {
            registry.find_file_descriptor(path)
        });
        link_by_name(&file, &visible)?;
    } else {
        link_by_index(&file, &dependencies, &handle.dependency_indexes, config)?;
    }

    validate_file(&file, config)?;
    registry.publish(&file, &handle.types)?;

    debug!(
        "built {} ({} messages, {} enums, {} extensions)",
        path,
        file.all_messages().len(),
        file.all_enums().len(),
        file.all_extensions().len()
    );
    Ok(file)
}

/// The built imports of `file`, in declaration order; `None` for a missing weak import.
fn build_dependencies(registry: &Registry, file: &FileDescriptor) -> Result<Vec<Option<FileRc>>> {
    file.dependencies
        .iter()
        .enumerate()
        .map(|(index, path)| match registry.find_file_by_path(path) {
            Some(dependency) => dependency.descriptor().map(Some),
            None if file.weak_dependencies.contains(&index) => {
                debug!("{}: weak import {} is not registered", file.path, path);
                Ok(None)
            }
            None => Err(Error::UnresolvedReference(format!(
                "{} imports {} which is not registered",
                file.path, path
            ))),
        })
        .collect()
}

/// Enums then messages of a file, the file's share of the symbol space.
fn symbols(file: &FileDescriptor) -> impl Iterator<Item = DescriptorRef> + '_ {
    file.all_enums()
        .iter()
        .map(|enumeration| DescriptorRef::Enum(enumeration.clone()))
        .chain(
            file.all_messages()
                .iter()
                .map(|message| DescriptorRef::Message(message.clone())),
        )
}

fn link_by_index(
    file: &FileDescriptor,
    dependencies: &[Option<FileRc>],
    indexes: &[u32],
    config: &ValidationConfig,
) -> Result<()> {
    let slots = ReferenceSlot::collect(file);
    if slots.len() != indexes.len() {
        return Err(malformed_error!(
            "{} has {} type references but {} dependency indexes were supplied",
            file.path,
            slots.len(),
            indexes.len()
        ));
    }

    let space: Vec<DescriptorRef> = symbols(file)
        .chain(dependencies.iter().flatten().flat_map(|dependency| symbols(dependency)))
        .collect();

    for (slot, &index) in slots.iter().zip(indexes) {
        let target = usize::try_from(index)
            .ok()
            .and_then(|index| space.get(index))
            .ok_or_else(|| {
                malformed_error!(
                    "Dependency index {} of {} is outside the {} known declarations",
                    index,
                    slot.owner(),
                    space.len()
                )
            })?;

        if config.enable_type_name_cross_check {
            if let Some(stored) = slot.stored_name().filter(|name| name.starts_with('.')) {
                if strip_leading_dot(stored) != target.full_name() {
                    return Err(malformed_error!(
                        "{} refers to {} but its dependency index points at {}",
                        slot.owner(),
                        stored,
                        target.full_name()
                    ));
                }
            }
        }

        trace!("{} -> {}", slot.owner(), target.full_name());
        slot.bind(target)?;
    }
    Ok(())
}
