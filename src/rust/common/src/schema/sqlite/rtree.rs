//! Schema definition for the `rtree` bounding-box table.
//!
//! Rows carry their own surrogate `id`; the record identifier lives in
//! `wof_id`, which is the column removal and pruning must key on.

use crate::constants::TABLE_RTREE;
use crate::schema::{FieldDef, TableDef};

pub const TABLE: TableDef = TableDef { name: TABLE_RTREE };

pub const ID: FieldDef = FieldDef::key("id");
pub const WOF_ID: FieldDef = FieldDef::key("wof_id");
pub const IS_ALT: FieldDef = FieldDef::attribute("is_alt");
pub const ALT_LABEL: FieldDef = FieldDef::key("alt_label");
pub const MIN_X: FieldDef = FieldDef::geometry("min_x");
pub const MIN_Y: FieldDef = FieldDef::geometry("min_y");
pub const MAX_X: FieldDef = FieldDef::geometry("max_x");
pub const MAX_Y: FieldDef = FieldDef::geometry("max_y");
pub const GEOMETRY: FieldDef = FieldDef::geometry("geometry");
pub const LASTMODIFIED: FieldDef = FieldDef::attribute("lastmodified");

/// Columns written on insert (the surrogate `id` is assigned by SQLite).
pub const INSERT_COLUMNS: &[FieldDef] = &[
    WOF_ID, IS_ALT, ALT_LABEL,
    MIN_X, MIN_Y, MAX_X, MAX_Y,
    GEOMETRY, LASTMODIFIED,
];

/// All columns in definition order.
pub const ALL_COLUMNS: &[FieldDef] = &[
    ID, WOF_ID, IS_ALT, ALT_LABEL,
    MIN_X, MIN_Y, MAX_X, MAX_Y,
    GEOMETRY, LASTMODIFIED,
];
