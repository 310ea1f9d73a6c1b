//! Schema definition for the `spelunker` summary-document table.

use crate::constants::TABLE_SPELUNKER;
use crate::schema::{FieldDef, TableDef};

pub const TABLE: TableDef = TableDef { name: TABLE_SPELUNKER };

pub const ID: FieldDef = FieldDef::key("id");
/// Alternate geometry label, empty string for the primary geometry.
pub const ALT: FieldDef = FieldDef::key("alt");
/// Prepared summary document (JSON), without geometry.
pub const BODY: FieldDef = FieldDef::payload("body");
pub const LASTMODIFIED: FieldDef = FieldDef::attribute("lastmodified");

/// All columns in definition order.
pub const ALL_COLUMNS: &[FieldDef] = &[ID, ALT, BODY, LASTMODIFIED];
