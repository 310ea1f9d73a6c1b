//! Schema definition for the `whosonfirst` geometry table.

use crate::constants::TABLE_WHOSONFIRST;
use crate::schema::{FieldDef, TableDef};

pub const TABLE: TableDef = TableDef { name: TABLE_WHOSONFIRST };

pub const ID: FieldDef = FieldDef::key("id");
pub const NAME: FieldDef = FieldDef::attribute("name");
pub const COUNTRY: FieldDef = FieldDef::attribute("country");
pub const PLACETYPE: FieldDef = FieldDef::attribute("placetype");
pub const PARENT_ID: FieldDef = FieldDef::attribute("parent_id");
pub const IS_CURRENT: FieldDef = FieldDef::attribute("is_current");
pub const IS_DEPRECATED: FieldDef = FieldDef::attribute("is_deprecated");
pub const IS_CEASED: FieldDef = FieldDef::attribute("is_ceased");
pub const GEOMETRY: FieldDef = FieldDef::geometry("geometry");
pub const CENTROID: FieldDef = FieldDef::geometry("centroid");
pub const MIN_X: FieldDef = FieldDef::geometry("min_x");
pub const MIN_Y: FieldDef = FieldDef::geometry("min_y");
pub const MAX_X: FieldDef = FieldDef::geometry("max_x");
pub const MAX_Y: FieldDef = FieldDef::geometry("max_y");
pub const PROPERTIES: FieldDef = FieldDef::payload("properties");
pub const LASTMODIFIED: FieldDef = FieldDef::attribute("lastmodified");

/// All columns in definition order.
pub const ALL_COLUMNS: &[FieldDef] = &[
    ID, NAME, COUNTRY, PLACETYPE, PARENT_ID,
    IS_CURRENT, IS_DEPRECATED, IS_CEASED,
    GEOMETRY, CENTROID, MIN_X, MIN_Y, MAX_X, MAX_Y,
    PROPERTIES, LASTMODIFIED,
];
