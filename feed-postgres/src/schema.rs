use std::fmt;

use pg_escape::quote_identifier;
use serde::{Deserialize, Serialize};

/// Fully qualified Postgres table name.
///
/// Feed and source table names come from configuration, so every place that
/// interpolates them into SQL must go through [`TableName::as_quoted_identifier`]
/// to get identifier quoting right for reserved words and special characters.
#[derive(Debug, Clone, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName {
    /// The schema containing the table.
    pub schema: String,
    /// The table name within the schema.
    pub name: String,
}

impl TableName {
    /// Creates a new [`TableName`] from schema and table components.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> TableName {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Parses a possibly schema-qualified name, defaulting the schema to `public`.
    ///
    /// Only the first `.` is treated as a separator; anything after it is the
    /// table name verbatim.
    pub fn from_qualified(qualified: &str) -> TableName {
        match qualified.split_once('.') {
            Some((schema, name)) => Self::new(schema, name),
            None => Self::new("public", qualified),
        }
    }

    /// Renders the table name as a properly quoted Postgres identifier pair.
    pub fn as_quoted_identifier(&self) -> String {
        let quoted_schema = quote_identifier(&self.schema);
        let quoted_name = quote_identifier(&self.name);

        format!("{quoted_schema}.{quoted_name}")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{0}.{1}", self.schema, self.name))
    }
}

/// Renders a single column name as a quoted Postgres identifier.
pub fn quoted_column(name: &str) -> String {
    quote_identifier(name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_qualified_with_schema() {
        let table = TableName::from_qualified("catalog.price_feed");
        assert_eq!(table.schema, "catalog");
        assert_eq!(table.name, "price_feed");
    }

    #[test]
    fn from_qualified_defaults_to_public() {
        let table = TableName::from_qualified("price_feed");
        assert_eq!(table.schema, "public");
        assert_eq!(table.name, "price_feed");
    }

    #[test]
    fn quoting_escapes_special_characters() {
        let table = TableName::new("public", "price Feed");
        assert_eq!(table.as_quoted_identifier(), r#"public."price Feed""#);
    }

    #[test]
    fn quoting_passes_plain_identifiers_through() {
        let table = TableName::new("catalog", "price_feed");
        assert_eq!(table.as_quoted_identifier(), "catalog.price_feed");
    }
}
