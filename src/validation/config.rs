//! Validation configuration for descriptor construction
//!
//! This module provides the switches deciding which semantic checks run after a file has
//! been linked, and the nesting bound applied while it is constructed.

use crate::descriptor::MAX_NESTING_DEPTH;

/// Configuration for descriptor validation
///
/// Construction always validates:
/// - Names, numbers and types are present
/// - Full names are unique within the file
/// - Field numbers are unique within a message
/// - Oneof indices point at a declared oneof
///
/// This configuration covers the checks that need the linked tree or that generated code
/// may legitimately want to skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ValidationConfig {
    /// Reject field numbers outside `1..=536870911` and inside the implementation-reserved
    /// block `19000..=19999`
    pub enable_number_checks: bool,

    /// Reject fields and enum values hitting declared reserved ranges or names
    pub enable_reserved_checks: bool,

    /// Reject invalid or overlapping extension ranges, fields inside them, and extensions
    /// numbered outside their extendee's ranges
    pub enable_extension_range_checks: bool,

    /// Enforce proto3 rules: no required fields, no explicit defaults, no groups, first
    /// enum value zero
    pub enable_proto3_checks: bool,

    /// Enforce map entry shape and repeated cardinality of map fields
    pub enable_map_entry_checks: bool,

    /// Reject enums without values and number aliases without `allow_alias`
    pub enable_enum_checks: bool,

    /// Reject two fields of one message sharing a JSON name
    pub enable_json_name_checks: bool,

    /// While linking through dependency indexes, compare the resolved full name with the
    /// stored type name
    pub enable_type_name_cross_check: bool,

    /// Maximum nesting depth of message declarations (default: 64)
    pub max_nesting_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enable_number_checks: true,
            enable_reserved_checks: true,
            enable_extension_range_checks: true,
            enable_proto3_checks: true,
            enable_map_entry_checks: true,
            enable_enum_checks: true,
            enable_json_name_checks: false,
            enable_type_name_cross_check: true,
            max_nesting_depth: MAX_NESTING_DEPTH,
        }
    }
}

impl ValidationConfig {
    /// Creates a minimal validation configuration for maximum performance
    ///
    /// Only the checks construction performs anyway remain; use for descriptor bytes
    /// emitted by a trusted compiler.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            enable_number_checks: false,
            enable_reserved_checks: false,
            enable_extension_range_checks: false,
            enable_proto3_checks: false,
            enable_map_entry_checks: false,
            enable_enum_checks: false,
            enable_json_name_checks: false,
            enable_type_name_cross_check: false,
            max_nesting_depth: MAX_NESTING_DEPTH,
        }
    }

    /// Creates a validation configuration with all checks enabled
    #[must_use]
    pub fn strict() -> Self {
        Self {
            enable_json_name_checks: true,
            ..Self::default()
        }
    }

    /// Returns `true` if any post-link check is enabled.
    #[must_use]
    pub fn any_semantic_check(&self) -> bool {
        self.enable_number_checks
            || self.enable_reserved_checks
            || self.enable_extension_range_checks
            || self.enable_proto3_checks
            || self.enable_map_entry_checks
            || self.enable_enum_checks
            || self.enable_json_name_checks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_config_presets() {
        let minimal = ValidationConfig::minimal();
        assert!(!minimal.enable_number_checks);
        assert!(!minimal.enable_reserved_checks);
        assert!(!minimal.enable_type_name_cross_check);
        assert!(!minimal.any_semantic_check());
        assert_eq!(minimal.max_nesting_depth, 64);

        let strict = ValidationConfig::strict();
        assert!(strict.enable_json_name_checks);
        assert!(strict.enable_proto3_checks);
        assert!(strict.any_semantic_check());
    }

    #[test]
    fn test_default_config() {
        let default = ValidationConfig::default();
        assert!(default.enable_reserved_checks);
        assert!(!default.enable_json_name_checks);
        assert_ne!(default, ValidationConfig::strict());
        assert_eq!(default.max_nesting_depth, 64);
    }
}
