//! Canonical schema definitions for SQLite tables.
//!
//! Single source of truth for table and column names used by the table
//! implementations in the core crate and by the CLI. All definitions are
//! `const` with zero runtime cost.
//!
//! # Field Classification
//!
//! Each field has a [`FieldKind`] describing its role in a row:
//! - **Key**: identifiers and discriminators that make up a row's key
//! - **Attribute**: scalar values derived from document properties
//! - **Geometry**: WKT geometry or bounding-box coordinates
//! - **Payload**: serialized document bodies or property blobs

pub mod sqlite;

/// Role of a column within a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Identifier or discriminator column.
    Key,
    /// Scalar attribute derived from properties.
    Attribute,
    /// Geometry (WKT) or bounding-box coordinate.
    Geometry,
    /// Serialized document or property blob.
    Payload,
}

/// A named column with a role classification.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    /// Create a new key field.
    pub const fn key(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Key }
    }

    /// Create a new attribute field.
    pub const fn attribute(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Attribute }
    }

    /// Create a new geometry field.
    pub const fn geometry(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Geometry }
    }

    /// Create a new payload field.
    pub const fn payload(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Payload }
    }
}

/// A named table definition.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
}

/// Join column names with `, ` for use in INSERT/SELECT statements.
pub fn column_list(columns: &[FieldDef]) -> String {
    columns.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
}

/// Build numbered SQLite placeholders (`?1, ?2, ...`) for `count` columns.
pub fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_def_constructors() {
        let key = FieldDef::key("id");
        assert_eq!(key.name, "id");
        assert_eq!(key.kind, FieldKind::Key);

        let attr = FieldDef::attribute("name");
        assert_eq!(attr.kind, FieldKind::Attribute);

        let geom = FieldDef::geometry("geometry");
        assert_eq!(geom.kind, FieldKind::Geometry);

        let payload = FieldDef::payload("body");
        assert_eq!(payload.kind, FieldKind::Payload);
    }

    #[test]
    fn test_column_list() {
        let cols = [FieldDef::key("id"), FieldDef::payload("body")];
        assert_eq!(column_list(&cols), "id, body");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(3), "?1, ?2, ?3");
        assert_eq!(placeholders(0), "");
    }
}
