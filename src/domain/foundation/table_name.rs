//! Validated SQL table name.

use std::fmt;

use super::ValidationError;

/// Table holding the user rows when none is configured.
pub const DEFAULT_USERS_TABLE: &str = "users";

/// A table name, either `table` or `schema.table`.
///
/// Each part is a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`), so the quoted
/// form is safe to splice into a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    /// Validates `name`.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() > 2 || !parts.iter().all(|part| is_plain_identifier(part)) {
            return Err(ValidationError::invalid_format(
                "users_table",
                format!("'{}' is not a plain SQL identifier", name),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quotes each part: `public.users` becomes `"public"."users"`.
    pub fn quoted(&self) -> String {
        self.0
            .split('.')
            .map(|part| format!("\"{}\"", part))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_USERS_TABLE.to_string())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_plain_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_qualified_names() {
        assert_eq!(TableName::new("users").unwrap().quoted(), "\"users\"");
        assert_eq!(TableName::new("public.users").unwrap().quoted(), "\"public\".\"users\"");
        assert_eq!(TableName::new("_app_users2").unwrap().as_str(), "_app_users2");
    }

    #[test]
    fn rejects_injection_and_garbage() {
        assert!(TableName::new("users; DROP TABLE users").is_err());
        assert!(TableName::new("users\"").is_err());
        assert!(TableName::new("").is_err());
        assert!(TableName::new("1users").is_err());
        assert!(TableName::new("a.b.c").is_err());
        assert!(TableName::new("public.").is_err());
    }

    #[test]
    fn default_is_users() {
        assert_eq!(TableName::default().quoted(), "\"users\"");
    }
}
