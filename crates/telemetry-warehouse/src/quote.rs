//! Snowflake identifier and string-literal quoting.
//!
//! Statements are assembled by string composition, so every interpolated
//! identifier and value must pass through one of these functions.

/// Quote an identifier, doubling embedded double quotes.
///
/// Always quotes: unquoted Snowflake identifiers are upper-cased, which would
/// silently change the meaning of lowercase table and column names.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, escaping backslashes and single quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("''"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// `"a"."b"` qualified name.
#[must_use]
pub fn qualified_name(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(name))
}
