use sea_orm::entity::prelude::*;

use super::users::Role;

/// One-shot account invite. The token is a random 64-char hex string mailed
/// to the invitee; claiming consumes the row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "invites")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub token: String,

    pub name: String,

    pub email: String,

    pub department: Option<String>,

    /// Set for student-activation invites so the claim can find the
    /// matching roster row.
    pub usn: Option<String>,

    pub role: Role,

    /// RFC 3339 expiry, 24 hours after creation.
    pub expires_at: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
