//! Parser for per-field legacy metadata strings.
//!
//! The format is `<wire>,<number>,<opt|req|rep>` followed by optional comma separated
//! attributes: `packed`, `name=..`, `json=..`, `enum=..`, `proto3`, `deprecated`,
//! `weak=..`, `oneof` and `def=..`. A default value may itself contain commas, so `def=`
//! consumes the rest of the string.

use std::str::FromStr;

use log::trace;
use strum::{Display, EnumString};

use crate::{proto::FieldLabel, Error, Result};

/// Wire category named by the first element of a metadata string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum TagWire {
    Varint,
    Fixed32,
    Fixed64,
    Zigzag32,
    Zigzag64,
    Bytes,
    Group,
}

/// A parsed metadata string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FieldTag {
    pub wire: TagWire,
    pub number: i32,
    pub label: FieldLabel,
    pub packed: bool,
    pub name: Option<String>,
    pub json: Option<String>,
    pub enum_name: Option<String>,
    pub default: Option<String>,
    pub proto3: bool,
    pub deprecated: bool,
    pub weak: Option<String>,
}

impl FieldTag {
    /// Parse a metadata string.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedLegacyShape`] for a missing or unknown wire category,
    /// an unparsable or non-positive number, or an unknown cardinality.
    pub(crate) fn parse(tag: &str) -> Result<FieldTag> {
        let unsupported = |what: &str| Error::UnsupportedLegacyShape(format!("{what} in '{tag}'"));

        let mut parts = tag.splitn(4, ',');
        let wire = parts
            .next()
            .map(str::trim)
            .and_then(|wire| TagWire::from_str(wire).ok())
            .ok_or_else(|| unsupported("unknown wire category"))?;
        let number = parts
            .next()
            .and_then(|number| number.trim().parse::<i32>().ok())
            .filter(|number| *number > 0)
            .ok_or_else(|| unsupported("invalid field number"))?;
        let label = match parts.next().map(str::trim) {
            Some("opt") => FieldLabel::Optional,
            Some("req") => FieldLabel::Required,
            Some("rep") => FieldLabel::Repeated,
            _ => return Err(unsupported("invalid cardinality")),
        };

        let mut parsed = FieldTag {
            wire,
            number,
            label,
            packed: false,
            name: None,
            json: None,
            enum_name: None,
            default: None,
            proto3: false,
            deprecated: false,
            weak: None,
        };

        let mut rest = parts.next().unwrap_or_default();
        while !rest.is_empty() {
            if let Some(default) = rest.strip_prefix("def=") {
                parsed.default = Some(default.to_string());
                break;
            }
            let (attribute, tail) = rest.split_once(',').unwrap_or((rest, ""));
            rest = tail;

            match attribute.split_once('=') {
                Some(("name", value)) => parsed.name = Some(value.to_string()),
                Some(("json", value)) => parsed.json = Some(value.to_string()),
                Some(("enum", value)) => parsed.enum_name = Some(value.to_string()),
                Some(("weak", value)) => parsed.weak = Some(value.to_string()),
                None if attribute == "packed" => parsed.packed = true,
                None if attribute == "proto3" => parsed.proto3 = true,
                None if attribute == "deprecated" => parsed.deprecated = true,
                _ => trace!("ignoring attribute '{}' in '{}'", attribute, tag),
            }
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_tag() {
        let tag = FieldTag::parse("varint,1,opt,name=foo").unwrap();
        assert_eq!(tag.wire, TagWire::Varint);
        assert_eq!(tag.number, 1);
        assert_eq!(tag.label, FieldLabel::Optional);
        assert_eq!(tag.name.as_deref(), Some("foo"));
        assert!(!tag.proto3);
    }

    #[test]
    fn all_attributes() {
        let tag = FieldTag::parse(
            "zigzag64,7,rep,packed,name=deltas,json=allDeltas,proto3,deprecated,weak=w.proto,oneof",
        )
        .unwrap();
        assert_eq!(tag.wire, TagWire::Zigzag64);
        assert_eq!(tag.label, FieldLabel::Repeated);
        assert!(tag.packed && tag.proto3 && tag.deprecated);
        assert_eq!(tag.json.as_deref(), Some("allDeltas"));
        assert_eq!(tag.weak.as_deref(), Some("w.proto"));
    }

    #[test]
    fn default_keeps_commas() {
        let tag = FieldTag::parse("bytes,3,opt,name=greeting,def=hello, world").unwrap();
        assert_eq!(tag.default.as_deref(), Some("hello, world"));

        let tag = FieldTag::parse("varint,4,opt,name=mode,enum=pkg.Mode,def=2").unwrap();
        assert_eq!(tag.enum_name.as_deref(), Some("pkg.Mode"));
        assert_eq!(tag.default.as_deref(), Some("2"));
    }

    #[test]
    fn rejects_garbage() {
        for tag in ["", "float,1,opt", "varint,x,opt", "varint,0,opt", "varint,1,maybe", "varint,1"] {
            assert!(
                matches!(FieldTag::parse(tag), Err(Error::UnsupportedLegacyShape(_))),
                "{tag}"
            );
        }
    }
}
