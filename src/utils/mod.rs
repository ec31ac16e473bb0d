//! Shared helpers that do not belong to a single component.
//!
//! - [`decompress`] - detection and inflation of gzip compressed descriptor bytes
//! - [`names`] - the naming rules shared by every construction path (JSON names, map entry
//!   names, scope joining)

pub mod decompress;
pub mod names;

pub use names::{json_camel_case, map_entry_name};
