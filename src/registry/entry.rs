//! Per-file registry entries.

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        OnceLock, Weak,
    },
};

use crate::{
    builder,
    descriptor::{FileRc, TypeHandle},
    proto::FileSeed,
    registry::{Registry, Shared},
    Error, Result,
};

/// A registered file: its seed, its inputs, and the exactly-once build of its tree.
///
/// Handles are created by [`Registry::register_raw_file`] (lazy, the tree is built on first
/// access) and [`Registry::register_file`] (eager, the tree is supplied). Concurrent first
/// accesses to [`FileHandle::descriptor`] block until a single build finishes, and all
/// callers observe the same tree or the same error.
pub struct FileHandle {
    pub(crate) seed: FileSeed,
    pub(crate) bytes: Vec<u8>,
    pub(crate) types: Vec<TypeHandle>,
    pub(crate) dependency_indexes: Vec<u32>,
    pub(crate) registry: Weak<Shared>,
    cell: OnceLock<Result<FileRc>>,
    builds: AtomicUsize,
}

impl FileHandle {
    pub(crate) fn pending(
        seed: FileSeed,
        bytes: Vec<u8>,
        types: Vec<TypeHandle>,
        dependency_indexes: Vec<u32>,
        registry: Weak<Shared>,
    ) -> Self {
        FileHandle {
            seed,
            bytes,
            types,
            dependency_indexes,
            registry,
            cell: OnceLock::new(),
            builds: AtomicUsize::new(0),
        }
    }

    pub(crate) fn built(
        seed: FileSeed,
        bytes: Vec<u8>,
        file: FileRc,
        registry: Weak<Shared>,
    ) -> Self {
        let handle = FileHandle {
            seed,
            bytes,
            types: Vec::new(),
            dependency_indexes: Vec::new(),
            registry,
            cell: OnceLock::new(),
            builds: AtomicUsize::new(0),
        };
        let _ = handle.cell.set(Ok(file));
        handle
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.seed.path
    }

    /// The name-level scan taken at registration.
    #[must_use]
    pub fn seed(&self) -> &FileSeed {
        &self.seed
    }

    /// The uncompressed descriptor bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the built tree, building it first if needed.
    ///
    /// # Errors
    /// Returns the (cached) build failure: [`Error::Malformed`],
    /// [`Error::UnresolvedReference`], [`Error::CyclicDependency`],
    /// [`Error::SemanticViolation`], [`Error::NameConflict`] or [`Error::RecursionLimit`].
    pub fn descriptor(&self) -> Result<FileRc> {
        self.cell
            .get_or_init(|| {
                self.builds.fetch_add(1, Ordering::SeqCst);
                let registry = self
                    .registry
                    .upgrade()
                    .map(Registry::from_shared)
                    .ok_or_else(|| {
                        Error::UnresolvedReference(format!(
                            "registry owning {} was dropped",
                            self.path()
                        ))
                    })?;
                builder::build(&registry, self)
            })
            .clone()
    }

    /// Returns `true` once a build has completed, successfully or not.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Returns `true` if the build completed and failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.cell.get(), Some(Err(_)))
    }

    /// How many times a build of this file was started. Never exceeds one.
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.seed.path)
            .field("package", &self.seed.package)
            .field("dependencies", &self.seed.dependencies)
            .field("types", &self.types.len())
            .field("built", &self.is_built())
            .finish()
    }
}
