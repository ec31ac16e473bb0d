//! Cycle detection over the declared imports of registered files.
//!
//! Runs on seeds only, before a build recurses into its dependencies, so a file whose
//! import chain leads back to itself fails instead of re-entering its own build.

use std::collections::HashSet;

use crate::{registry::Registry, Error, Result};

/// Fail with [`Error::CyclicDependency`] if the imports reachable from `root` form a cycle.
///
/// Unregistered imports are ignored here; the build reports them as unresolved. Files
/// that are already built are not descended into.
pub(crate) fn check_cycles(registry: &Registry, root: &str) -> Result<()> {
    let mut visited = HashSet::new();
    let mut stack = Vec::new();
    detect_cycle(registry, root, &mut visited, &mut stack)
}

fn detect_cycle(
    registry: &Registry,
    path: &str,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) -> Result<()> {
    visited.insert(path.to_string());
    stack.push(path.to_string());

    if let Some(handle) = registry.find_file_by_path(path) {
        for dependency in &handle.seed.dependencies {
            if let Some(start) = stack.iter().position(|entry| entry == dependency) {
                let mut chain = stack[start..].to_vec();
                chain.push(dependency.clone());
                return Err(Error::CyclicDependency(chain.join(" -> ")));
            }
            if visited.contains(dependency) {
                continue;
            }
            let pending = registry
                .find_file_by_path(dependency)
                .is_some_and(|dependency| !dependency.is_built());
            if pending {
                detect_cycle(registry, dependency, visited, stack)?;
            }
        }
    }

    stack.pop();
    Ok(())
}
