use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-event layout overrides for the rendered certificate. Every field is
/// optional; the renderer falls back to institutional defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(default)]
pub struct CertificateStyle {
    pub college_name: Option<String>,

    pub college_address: Option<String>,

    pub header_department: Option<String>,

    pub certificate_title: Option<String>,

    /// "Workshop", "Seminar", "Hackathon", ...
    pub event_type: Option<String>,

    /// Free-form duration fragment, e.g. "3-day".
    pub event_duration: Option<String>,

    pub signature_text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// ISO `YYYY-MM-DD`. Kept as supplied: the certificate hash preimage
    /// concatenates this string verbatim.
    pub date: String,

    pub description: String,

    pub created_by: i32,

    /// Flipped true after a bulk issuance pass, even when every
    /// participant was skipped.
    pub certificates_issued: bool,

    #[sea_orm(column_type = "Json")]
    pub certificate_style: Option<CertificateStyle>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
