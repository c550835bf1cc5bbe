use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// One child of a top-level realtime collection, stored as a JSON document.
///
/// `sessions/cs101_1_2025-01-15` is the row (`sessions`, `cs101_1_2025-01-15`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "realtime_documents")]
pub struct Model {
    /// First path segment, e.g. `sessions` or `enrollments`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub collection: String,

    /// Second path segment.
    #[sea_orm(primary_key, auto_increment = false)]
    pub doc_key: String,

    /// Serialized JSON subtree.
    #[sea_orm(column_type = "Text")]
    pub body: String,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
