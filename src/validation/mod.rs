//! Semantic validation of linked descriptor trees.
//!
//! Construction already rejects what would make a tree ambiguous (missing names or types,
//! duplicate names, duplicate field numbers, bad oneof indices, excessive nesting). The
//! checks in this module go further and enforce the structural rules of the schema
//! language on a fully linked file. Which checks run is controlled by [`ValidationConfig`].
//!
//! - [`ValidationConfig`] - switches and bounds, with `default`, `minimal` and `strict`
//!   presets
//! - [`validate_file`] - runs every enabled check over a linked file

mod config;
mod semantic;

pub use config::ValidationConfig;
pub use semantic::{validate_file, FIRST_RESERVED_NUMBER, LAST_RESERVED_NUMBER};
