// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # protolens
//!
//! [![Crates.io](https://img.shields.io/crates/v/protolens.svg)](https://crates.io/crates/protolens)
//! [![Documentation](https://docs.rs/protolens/badge.svg)](https://docs.rs/protolens)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/protolens/blob/main/LICENSE-APACHE)
//!
//! The reflective core of a protocol-buffer runtime. `protolens` turns descriptor bytes (the
//! binary encoding of a `FileDescriptorProto`) into an immutable, queryable descriptor tree,
//! binds that tree to the runtime types that represent its messages and enums, and keeps
//! schema-driven code working uniformly no matter which generator produced a type.
//!
//! ## Features
//!
//! - **Lazy building** - files are registered as raw bytes and built on first access, exactly
//!   once, even under concurrent first access
//! - **Index-table linking** - references are resolved through the dependency index tables
//!   emitted by code generators, with a by-name fallback
//! - **Legacy inference** - descriptors are reconstructed for old generated types that only
//!   carry per-field metadata strings
//! - **Conversion** - trees convert to and from schema messages, with full semantic
//!   validation on the inbound path
//! - **Weak cross references** - dependency cycles and out-of-order loading never create
//!   strong reference cycles
//!
//! ## Quick Start
//!
//! ```rust
//! use protolens::prelude::*;
//!
//! # let bytes = std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/samples/deprecated.pb"))?;
//! let registry = Registry::new();
//! registry.register_raw_file(FileBuilder::new(bytes))?;
//!
//! // Looking a declaration up builds the file that owns it
//! let found = registry
//!     .find_descriptor_by_name("goproto.protoc.comments.DeprecatedMessage")
//!     .unwrap();
//! let message = found.as_message().unwrap();
//! assert_eq!(message.fields.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`wire`] - varint, tag and length-delimited primitives
//! - [`proto`] - hand-written decoder and encoder for the descriptor schema messages
//! - [`descriptor`] - the immutable descriptor tree
//! - [`registry`] - the name and type directory, owner of lazily built files
//! - [`builder`] - file building and index-table linking
//! - [`legacy`] - descriptor inference for legacy runtime types
//! - [`convert`] - conversion between trees and schema messages
//! - [`validation`] - configurable semantic checks
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). Construction failures are
//! cached: a file or legacy type that failed once reports the same error on every later
//! access.
//!
//! ```rust
//! use protolens::{Error, FileBuilder, Registry};
//!
//! let registry = Registry::new();
//! match registry.register_raw_file(FileBuilder::new(vec![0x0a])) {
//!     Err(Error::Malformed { message, .. }) => println!("Malformed bytes: {}", message),
//!     Err(e) => println!("Error: {}", e),
//!     Ok(_) => unreachable!(),
//! }
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use protolens::prelude::*;
///
/// let registry = Registry::with_config(ValidationConfig::strict());
/// assert!(registry.is_empty());
/// ```
pub mod prelude;

pub mod builder;
pub mod convert;
pub mod descriptor;
pub mod legacy;
pub mod proto;
pub mod registry;
pub mod utils;
pub mod validation;
pub mod wire;

/// `protolens` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `protolens` Error type
///
/// See [`enum@Error`] for the list of failure categories.
pub use error::Error;

/// Entry points for registering and looking up descriptors.
pub use registry::{FileHandle, Registry};

/// Input of a lazily built file.
pub use builder::FileBuilder;

/// Runtime type identity bound to message and enum descriptors.
pub use descriptor::TypeHandle;

/// Semantic check configuration.
pub use validation::ValidationConfig;
