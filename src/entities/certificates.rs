use sea_orm::entity::prelude::*;

/// Locally stored snapshot of an externally minted certificate.
///
/// Student and event fields are denormalized copies taken at issuance time;
/// later edits to users or events never rewrite an issued certificate.
/// Revocation state is not stored here; verification re-derives it from
/// the ledger on every call.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "certificates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Public identifier, `CERT-` + 10 alphanumeric chars.
    #[sea_orm(unique)]
    pub certificate_id: String,

    /// Token id assigned by the ledger contract at mint time.
    pub token_id: String,

    /// Hex SHA-256 over lowercased email + event date + event name.
    pub certificate_hash: String,

    pub transaction_hash: String,

    pub student_name: String,

    pub student_email: String,

    pub event_name: String,

    pub event_date: String,

    pub issued_by: i32,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
