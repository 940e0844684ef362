use sea_orm::entity::prelude::*;

/// Pending student imported from a CSV roster, awaiting account activation.
/// The row is deleted once a matching user is created.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "student_roster")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(unique)]
    pub email: String,

    #[sea_orm(unique)]
    pub usn: String,

    pub department: String,

    pub year: i32,

    pub semester: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
