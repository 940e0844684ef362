use sea_orm::entity::prelude::*;

/// Registration list entry owned by an event. The (event_id, email) pair
/// is kept unique by a migration-level index.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "event_participants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub event_id: i32,

    pub name: String,

    /// Stored lowercase.
    pub email: String,

    pub registered_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
