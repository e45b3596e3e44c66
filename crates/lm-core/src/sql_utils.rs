//! SQL identifier helpers
//!
//! Identifier quoting for dynamically built statements, plus the naming rule
//! for legacy locale-suffixed columns.

use crate::locale::Locale;

/// Quote a SQL identifier to prevent injection.
///
/// Wraps the identifier in double quotes and escapes any embedded double quotes
/// by doubling them, following the SQL standard.
///
/// # Examples
/// ```
/// use lm_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("SiteTree"), r#""SiteTree""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a column reference qualified by a table alias.
///
/// ```
/// use lm_core::sql_utils::qualified_column;
/// assert_eq!(qualified_column("t0", "Title"), r#""t0"."Title""#);
/// ```
pub fn qualified_column(alias: &str, column: &str) -> String {
    format!("{}.{}", quote_ident(alias), quote_ident(column))
}

/// Name of the legacy column holding `field` translated into `locale`.
///
/// ```
/// use lm_core::{sql_utils::legacy_column, Locale};
/// let locale = Locale::try_new("de_AT").unwrap();
/// assert_eq!(legacy_column("Title", &locale), "Title_de_AT");
/// ```
pub fn legacy_column(field: &str, locale: &Locale) -> String {
    format!("{}_{}", field, locale)
}

/// Escape a SQL string literal value by doubling single quotes.
///
/// This is for use inside single-quoted SQL string literals, not identifiers.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
