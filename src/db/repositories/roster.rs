use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use crate::entities::prelude::*;
use crate::entities::student_roster;

#[derive(Debug, Clone)]
pub struct NewRosterEntry {
    pub name: String,
    pub email: String,
    pub usn: String,
    pub department: String,
    pub year: i32,
    pub semester: String,
}

pub struct RosterRepository {
    conn: DatabaseConnection,
}

impl RosterRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn exists_by_email_or_usn(&self, email: &str, usn: &str) -> Result<bool> {
        let count = StudentRoster::find()
            .filter(
                student_roster::Column::Email
                    .eq(email.to_lowercase())
                    .or(student_roster::Column::Usn.eq(usn.to_lowercase())),
            )
            .count(&self.conn)
            .await
            .context("Failed to check roster existence")?;

        Ok(count > 0)
    }

    pub async fn insert(&self, entry: NewRosterEntry) -> Result<student_roster::Model> {
        let active = student_roster::ActiveModel {
            name: Set(entry.name),
            email: Set(entry.email.to_lowercase()),
            usn: Set(entry.usn.to_lowercase()),
            department: Set(entry.department),
            year: Set(entry.year),
            semester: Set(entry.semester),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert roster entry")
    }

    pub async fn find_by_email_and_usn(
        &self,
        email: &str,
        usn: &str,
    ) -> Result<Option<student_roster::Model>> {
        StudentRoster::find()
            .filter(student_roster::Column::Email.eq(email.to_lowercase()))
            .filter(student_roster::Column::Usn.eq(usn.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query roster entry")
    }

    /// The pending row is consumed once the matching account exists.
    pub async fn delete(&self, id: i32) -> Result<()> {
        StudentRoster::delete_many()
            .filter(student_roster::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to delete roster entry")?;

        Ok(())
    }
}
