use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Closed set of account roles. Route guards check capabilities against
/// this enum instead of matching on free-form role strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Role {
    #[sea_orm(string_value = "Student")]
    Student,

    #[sea_orm(string_value = "Faculty")]
    Faculty,

    #[sea_orm(string_value = "SuperAdmin")]
    SuperAdmin,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// Stored lowercase; all lookups normalize first.
    #[sea_orm(unique)]
    pub email: String,

    /// University serial number, present for students activated from a roster.
    #[sea_orm(unique)]
    pub usn: Option<String>,

    /// Argon2id password hash
    pub password_hash: String,

    /// Random API key (64-char hex string)
    pub api_key: String,

    pub role: Role,

    /// External wallet address (`0x` + 40 hex). Certificates cannot be
    /// issued to a student until this is bound.
    pub wallet_address: Option<String>,

    pub department: Option<String>,

    pub year: Option<i32>,

    pub semester: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
