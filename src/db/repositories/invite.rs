use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::constants::INVITE_TTL_HOURS;
use crate::entities::invites;
use crate::entities::prelude::*;
use crate::entities::users::Role;

use super::user::generate_token;

pub struct InviteRepository {
    conn: DatabaseConnection,
}

impl InviteRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        name: &str,
        email: &str,
        department: Option<&str>,
        usn: Option<&str>,
        role: Role,
    ) -> Result<invites::Model> {
        let now = Utc::now();

        let active = invites::ActiveModel {
            token: Set(generate_token()),
            name: Set(name.to_string()),
            email: Set(email.to_lowercase()),
            department: Set(department.map(ToString::to_string)),
            usn: Set(usn.map(|u| u.to_lowercase())),
            role: Set(role),
            expires_at: Set((now + Duration::hours(INVITE_TTL_HOURS)).to_rfc3339()),
            created_at: Set(now.to_rfc3339()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert invite")
    }

    /// Returns the invite only while it is still within its validity window.
    pub async fn find_valid(&self, token: &str) -> Result<Option<invites::Model>> {
        let invite = Invites::find()
            .filter(invites::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query invite")?;

        let Some(invite) = invite else {
            return Ok(None);
        };

        let expired = chrono::DateTime::parse_from_rfc3339(&invite.expires_at)
            .map(|expiry| expiry < Utc::now())
            .unwrap_or(true);

        Ok(if expired { None } else { Some(invite) })
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        Invites::delete_many()
            .filter(invites::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to delete invite")?;

        Ok(())
    }
}
