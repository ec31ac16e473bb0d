use log::debug;

use crate::{
    convert::{link_by_name, visible_files, DescriptorResolver},
    descriptor::{build_file, FileRc},
    proto::{FileDescriptorProto, SchemaMessage},
    validation::{validate_file, ValidationConfig},
    Error, Result,
};

/// Build a fully validated tree from a schema message, using [`ValidationConfig::strict`].
///
/// Imports are looked up through `resolver`; references are resolved by name with
/// the usual scoping rules, against the file itself and its imports (including what those
/// re-export publicly).
///
/// # Errors
/// - [`Error::UnresolvedReference`] if an import or a referenced type cannot be found
/// - [`Error::SemanticViolation`] for duplicate names or numbers, reserved numbers or names,
///   bad extension ranges, invalid oneof indices, malformed map entries, proto3 violations
///   and unpermitted enum aliases
/// - [`Error::Malformed`] for missing names, numbers or types and unparsable defaults
/// - [`Error::RecursionLimit`] for excessive nesting
pub fn from_proto<R>(proto: &FileDescriptorProto, resolver: &R) -> Result<FileRc>
where
    R: DescriptorResolver + ?Sized,
{
    from_proto_with_config(proto, resolver, &ValidationConfig::strict())
}

/// Same as [`from_proto`] with explicit validation settings.
///
/// # Errors
/// See [`from_proto`]; checks disabled in `config` are skipped.
pub fn from_proto_with_config<R>(
    proto: &FileDescriptorProto,
    resolver: &R,
    config: &ValidationConfig,
) -> Result<FileRc>
where
    R: DescriptorResolver + ?Sized,
{
    let path = proto.name();
    debug!("converting {}", path);

    let mut imports = Vec::with_capacity(proto.dependency.len());
    for (index, dependency) in proto.dependency.iter().enumerate() {
        match resolver.resolve_file(dependency) {
            Some(file) => imports.push(file),
            None if proto
                .weak_dependency
                .iter()
                .any(|weak| usize::try_from(*weak).is_ok_and(|weak| weak == index)) =>
            {
                debug!("{}: weak import {} not available", path, dependency);
            }
            None => {
                return Err(Error::UnresolvedReference(format!(
                    "{path} imports {dependency} which cannot be resolved"
                )))
            }
        }
    }

    let file = build_file(proto, proto.encode_to_vec(), config)?;
    let visible = visible_files(imports, |path| resolver.resolve_file(path));
    link_by_name(&file, &visible)?;
    validate_file(&file, config)?;
    Ok(file)
}
