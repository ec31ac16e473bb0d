//! Name-level scan of descriptor bytes.
//!
//! Registering a file must not pay for building its tree, yet the registry needs to know
//! which names the file declares (to answer lookups and detect conflicts) and which files it
//! imports (to detect cycles). [`FileSeed::scan`] walks the encoded file once, reading only
//! names, dependency paths and the `map_entry` option, and skips everything else.

use crate::{
    proto::{message_options, read_string, RawOptions, MAX_DECODE_DEPTH},
    utils::names::join_name,
    wire::{Parser, Tag, WireType},
    Error, Result,
};

/// The kind of a declaration recorded in a [`FileSeed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum DeclarationKind {
    /// An enum type
    Enum,
    /// A message type
    Message,
    /// A synthetic map entry message
    MapEntry,
    /// An extension field
    Extension,
    /// A service
    Service,
}

/// A declaration found by the seed scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedDeclaration {
    /// Fully qualified name
    pub full_name: String,
    /// What is declared
    pub kind: DeclarationKind,
}

/// Names and imports of a file, extracted without building it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileSeed {
    /// Path of the file
    pub path: String,
    /// Package, empty if none
    pub package: String,
    /// Paths of the imported files, in declaration order
    pub dependencies: Vec<String>,
    /// Full names of the enums, top-level first, then per message in pre-order
    pub enums: Vec<String>,
    /// Full names of the messages in pre-order, paired with their `map_entry` flag
    pub messages: Vec<(String, bool)>,
    /// Full names of the extensions, top-level first, then per message in pre-order
    pub extensions: Vec<String>,
    /// Full names of the services
    pub services: Vec<String>,
}

#[derive(Default)]
struct MessageScan<'a> {
    name: String,
    map_entry: bool,
    enums: Vec<String>,
    extensions: Vec<String>,
    nested: Vec<&'a [u8]>,
}

impl FileSeed {
    /// Scan uncompressed descriptor bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the bytes cannot be walked, and
    /// [`crate::Error::RecursionLimit`] for absurdly deep message nesting.
    pub fn scan(data: &[u8]) -> Result<FileSeed> {
        let mut seed = FileSeed::default();
        let mut messages = Vec::new();
        let mut enums = Vec::new();
        let mut extensions = Vec::new();
        let mut services = Vec::new();

        let mut parser = Parser::new(data);
        while parser.has_more_data() {
            let tag = parser.read_tag()?;
            match tag.number {
                1 => seed.path = read_string(tag, &mut parser)?,
                2 => seed.package = read_string(tag, &mut parser)?,
                3 => seed.dependencies.push(read_string(tag, &mut parser)?),
                4 => messages.push(read_slice(tag, &mut parser)?),
                5 => enums.push(scan_name(read_slice(tag, &mut parser)?)?),
                6 => services.push(scan_name(read_slice(tag, &mut parser)?)?),
                7 => extensions.push(scan_name(read_slice(tag, &mut parser)?)?),
                _ => parser.skip(tag)?,
            }
        }

        let package = seed.package.clone();
        seed.enums = enums.iter().map(|name| join_name(&package, name)).collect();
        seed.extensions = extensions
            .iter()
            .map(|name| join_name(&package, name))
            .collect();
        seed.services = services
            .iter()
            .map(|name| join_name(&package, name))
            .collect();
        for message in messages {
            seed.scan_message(&package, message, 1)?;
        }

        Ok(seed)
    }

    fn scan_message(&mut self, scope: &str, data: &[u8], depth: usize) -> Result<()> {
        if depth > MAX_DECODE_DEPTH {
            return Err(Error::RecursionLimit(MAX_DECODE_DEPTH));
        }

        let mut scan = MessageScan::default();
        let mut parser = Parser::new(data);
        while parser.has_more_data() {
            let tag = parser.read_tag()?;
            match tag.number {
                1 => scan.name = read_string(tag, &mut parser)?,
                3 => scan.nested.push(read_slice(tag, &mut parser)?),
                4 => scan.enums.push(scan_name(read_slice(tag, &mut parser)?)?),
                6 => scan
                    .extensions
                    .push(scan_name(read_slice(tag, &mut parser)?)?),
                7 => {
                    let options = RawOptions::new(read_slice(tag, &mut parser)?.to_vec());
                    if let Some(map_entry) = options.get_bool(message_options::MAP_ENTRY)? {
                        scan.map_entry = map_entry;
                    }
                }
                _ => parser.skip(tag)?,
            }
        }

        let full_name = join_name(scope, &scan.name);
        for name in &scan.enums {
            self.enums.push(join_name(&full_name, name));
        }
        for name in &scan.extensions {
            self.extensions.push(join_name(&full_name, name));
        }
        self.messages.push((full_name.clone(), scan.map_entry));

        for nested in scan.nested {
            self.scan_message(&full_name, nested, depth + 1)?;
        }
        Ok(())
    }

    /// Number of runtime type slots the file expects: one per enum and one per message that
    /// is not a map entry.
    #[must_use]
    pub fn type_slot_count(&self) -> usize {
        self.enums.len()
            + self
                .messages
                .iter()
                .filter(|(_, map_entry)| !map_entry)
                .count()
    }

    /// All declarations, in the order enums, messages, extensions, services.
    #[must_use]
    pub fn declarations(&self) -> Vec<SeedDeclaration> {
        let enums = self.enums.iter().map(|name| (name, DeclarationKind::Enum));
        let messages = self.messages.iter().map(|(name, map_entry)| {
            let kind = if *map_entry {
                DeclarationKind::MapEntry
            } else {
                DeclarationKind::Message
            };
            (name, kind)
        });
        let extensions = self
            .extensions
            .iter()
            .map(|name| (name, DeclarationKind::Extension));
        let services = self
            .services
            .iter()
            .map(|name| (name, DeclarationKind::Service));

        enums
            .chain(messages)
            .chain(extensions)
            .chain(services)
            .map(|(full_name, kind)| SeedDeclaration {
                full_name: full_name.clone(),
                kind,
            })
            .collect()
    }
}

fn read_slice<'a>(tag: Tag, parser: &mut Parser<'a>) -> Result<&'a [u8]> {
    Parser::expect(tag, WireType::LengthDelimited)?;
    parser.read_bytes()
}

/// Read field 1 (`name`) of an embedded declaration.
fn scan_name(data: &[u8]) -> Result<String> {
    let mut parser = Parser::new(data);
    let mut name = String::new();
    while parser.has_more_data() {
        let tag = parser.read_tag()?;
        if tag.number == 1 {
            name = read_string(tag, &mut parser)?;
        } else {
            parser.skip(tag)?;
        }
    }
    Ok(name)
}
