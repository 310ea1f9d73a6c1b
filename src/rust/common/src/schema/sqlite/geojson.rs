//! Schema definition for the `geojson` document table.

use crate::constants::TABLE_GEOJSON;
use crate::schema::{FieldDef, TableDef};

pub const TABLE: TableDef = TableDef { name: TABLE_GEOJSON };

pub const ID: FieldDef = FieldDef::key("id");
/// Alternate geometry label, empty string for the primary geometry.
pub const ALT: FieldDef = FieldDef::key("alt");
pub const BODY: FieldDef = FieldDef::payload("body");
pub const LASTMODIFIED: FieldDef = FieldDef::attribute("lastmodified");

/// All columns in definition order.
pub const ALL_COLUMNS: &[FieldDef] = &[ID, ALT, BODY, LASTMODIFIED];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    #[test]
    fn table_name() {
        assert_eq!(TABLE.name, "geojson");
    }

    #[test]
    fn key_columns() {
        let keys: Vec<&str> = ALL_COLUMNS.iter()
            .filter(|f| matches!(f.kind, FieldKind::Key))
            .map(|f| f.name)
            .collect();
        assert_eq!(keys, vec!["id", "alt"]);
    }
}
