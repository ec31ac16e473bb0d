//! Naming rules applied while constructing descriptors.
//!
//! Decoding, conversion and legacy inference must all derive the same names from the same
//! input, so the rules live here and nowhere else.

/// Derive the default JSON name of a field.
///
/// Every `_` is dropped; an ASCII lower-case letter directly following one is upper-cased.
/// Any other character is kept verbatim, so a leading underscore upper-cases the first
/// letter and digits after an underscore are left alone.
///
/// ```rust
/// use protolens::utils::json_camel_case;
///
/// assert_eq!(json_camel_case("foo_bar"), "fooBar");
/// assert_eq!(json_camel_case("_foo"), "Foo");
/// assert_eq!(json_camel_case("foo_1"), "foo1");
/// ```
#[must_use]
pub fn json_camel_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut after_underscore = false;

    for c in name.chars() {
        if c == '_' {
            after_underscore = true;
            continue;
        }

        if after_underscore && c.is_ascii_lowercase() {
            result.push(c.to_ascii_uppercase());
        } else {
            result.push(c);
        }
        after_underscore = false;
    }

    result
}

/// Derive the name of the synthetic entry message backing a map field.
///
/// Underscores are removed, the first character and every character following an
/// underscore are upper-cased, and `Entry` is appended: `string_to_int` becomes
/// `StringToIntEntry`.
#[must_use]
pub fn map_entry_name(field_name: &str) -> String {
    let mut result = String::with_capacity(field_name.len() + 5);
    let mut upper_next = true;

    for c in field_name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            result.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }

    result.push_str("Entry");
    result
}

/// Join a scope and a local name into a full name.
///
/// An empty scope (a file without package) yields the local name unchanged.
#[must_use]
pub fn join_name(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

/// Strip a leading `.` from a fully qualified type reference.
#[must_use]
pub fn strip_leading_dot(name: &str) -> &str {
    name.strip_prefix('.').unwrap_or(name)
}

/// Field name used for a group whose message is called `message_name`.
#[must_use]
pub fn group_field_name(message_name: &str) -> String {
    message_name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_name_pins() {
        assert_eq!(json_camel_case("foo_bar"), "fooBar");
        assert_eq!(json_camel_case("_foo"), "Foo");
        assert_eq!(json_camel_case("foo_1"), "foo1");
        assert_eq!(json_camel_case("foo__bar"), "fooBar");
        assert_eq!(json_camel_case("foo_"), "foo");
        assert_eq!(json_camel_case("FooBar"), "FooBar");
        assert_eq!(json_camel_case("deprecated_field"), "deprecatedField");
        assert_eq!(json_camel_case(""), "");
    }

    #[test]
    fn map_entry_names() {
        assert_eq!(map_entry_name("string_to_int"), "StringToIntEntry");
        assert_eq!(map_entry_name("labels"), "LabelsEntry");
        assert_eq!(map_entry_name("_x"), "XEntry");
        assert_eq!(map_entry_name("a__b"), "ABEntry");
    }

    #[test]
    fn scopes() {
        assert_eq!(join_name("", "Foo"), "Foo");
        assert_eq!(join_name("pkg.Outer", "Inner"), "pkg.Outer.Inner");
        assert_eq!(strip_leading_dot(".pkg.Foo"), "pkg.Foo");
        assert_eq!(strip_leading_dot("Foo"), "Foo");
        assert_eq!(group_field_name("MyGroup"), "mygroup");
    }
}
