use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! semantic_error {
    ($fmt:expr) => {
        crate::Error::SemanticViolation($fmt.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::SemanticViolation(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Construction errors (everything raised while decoding, linking, converting or inferring a
/// descriptor) are fatal for the file or type being built. They are cached by the component
/// that produced them and handed out again to every later caller, which is why the type is
/// `Clone` and carries no foreign error sources.
///
/// # Error Categories
///
/// ## Decoding
/// - [`Error::Malformed`] - Corrupt or truncated descriptor bytes, bad handle tables
/// - [`Error::RecursionLimit`] - Declarations nested deeper than the configured limit
///
/// ## Registration and Linking
/// - [`Error::NameConflict`] - Divergent re-registration of a path, name or type
/// - [`Error::UnresolvedReference`] - Missing dependency file or referenced type
/// - [`Error::CyclicDependency`] - A file whose dependency chain includes itself
///
/// ## Validation
/// - [`Error::SemanticViolation`] - Duplicate numbers, reserved ranges, bad extension ranges
///
/// ## Legacy Inference
/// - [`Error::UnsupportedLegacyShape`] - Unparsable per-field metadata
///
/// # Examples
///
/// ```rust
/// use protolens::{Error, Registry, FileBuilder};
///
/// let registry = Registry::new();
/// match registry.register_raw_file(FileBuilder::new(vec![0x0a, 0xff])) {
///     Err(Error::Malformed { message, .. }) => println!("bad bytes: {message}"),
///     Err(other) => println!("other failure: {other}"),
///     Ok(_) => println!("registered"),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The descriptor bytes are damaged and could not be decoded.
    ///
    /// Raised for truncated varints, length prefixes running past the end of the buffer,
    /// unexpected wire types for well-known fields, invalid UTF-8 in names, failed
    /// decompression, and type handle tables whose shape does not match the file.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A registration diverges from what is already registered under the same key.
    ///
    /// Covers a file path re-registered with different bytes, a declaration name that is
    /// already owned by another file, and a type name bound to a different runtime handle.
    #[error("Name conflict - {0}")]
    NameConflict(String),

    /// A reference could not be resolved.
    ///
    /// Either a dependency file is not registered, or a field, extension or method refers
    /// to a message or enum that cannot be found through the resolver.
    #[error("Unresolved reference - {0}")]
    UnresolvedReference(String),

    /// The dependency chain of a file includes the file itself.
    ///
    /// The contained string lists the files along the cycle in the order they were visited.
    #[error("Cyclic dependency - {0}")]
    CyclicDependency(String),

    /// The schema violates a structural rule.
    ///
    /// Duplicate field numbers, numbers in the implementation-reserved range, names or
    /// numbers hitting declared reservations, extension numbers outside the declared
    /// extension ranges, duplicate full names and similar.
    #[error("Semantic violation - {0}")]
    SemanticViolation(String),

    /// A legacy runtime type carries metadata that cannot be interpreted.
    #[error("Unsupported legacy shape - {0}")]
    UnsupportedLegacyShape(String),

    /// Recursion limit reached.
    ///
    /// Message declarations are nested deeper than the configured maximum. The associated
    /// value is the limit that was exceeded.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),
}

impl Error {
    /// Returns `true` for errors that mean a reference could not be satisfied, which
    /// includes dependency cycles.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            Error::UnresolvedReference(_) | Error::CyclicDependency(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_records_location() {
        let err = malformed_error!("truncated varint at {}", 7);
        match err {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "truncated varint at 7");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn cycles_count_as_unresolved() {
        assert!(Error::CyclicDependency("a.proto -> a.proto".into()).is_unresolved());
        assert!(Error::UnresolvedReference("x".into()).is_unresolved());
        assert!(!semantic_error!("dup").is_unresolved());
    }
}
