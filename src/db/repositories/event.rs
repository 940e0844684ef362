use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use tracing::info;

use crate::entities::events::{self, CertificateStyle};
use crate::entities::{event_participants, prelude::*};

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub date: String,
    pub description: String,
    pub created_by: i32,
    pub certificate_style: Option<CertificateStyle>,
}

pub struct EventRepository {
    conn: DatabaseConnection,
}

impl EventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, new_event: NewEvent) -> Result<events::Model> {
        let active = events::ActiveModel {
            name: Set(new_event.name),
            date: Set(new_event.date),
            description: Set(new_event.description),
            created_by: Set(new_event.created_by),
            certificates_issued: Set(false),
            certificate_style: Set(new_event.certificate_style),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert event")?;

        info!("Created event '{}' ({})", model.name, model.date);
        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<events::Model>> {
        Events::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query event by ID")
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<events::Model>> {
        Events::find()
            .filter(events::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query event by name")
    }

    pub async fn list_all(&self) -> Result<Vec<events::Model>> {
        Events::find()
            .order_by_desc(events::Column::Date)
            .all(&self.conn)
            .await
            .context("Failed to list events")
    }

    /// Upcoming-first listing for the public page.
    pub async fn list_public(&self) -> Result<Vec<events::Model>> {
        Events::find()
            .order_by_asc(events::Column::Date)
            .all(&self.conn)
            .await
            .context("Failed to list public events")
    }

    pub async fn participants(&self, event_id: i32) -> Result<Vec<event_participants::Model>> {
        EventParticipants::find()
            .filter(event_participants::Column::EventId.eq(event_id))
            .order_by_asc(event_participants::Column::RegisteredAt)
            .all(&self.conn)
            .await
            .context("Failed to list participants")
    }

    /// Appends a registration. `Ok(false)` when the email is already on the
    /// list; the (event_id, email) unique index backstops concurrent
    /// registrations for the same address.
    pub async fn add_participant(&self, event_id: i32, name: &str, email: &str) -> Result<bool> {
        let email = email.to_lowercase();

        let already = EventParticipants::find()
            .filter(event_participants::Column::EventId.eq(event_id))
            .filter(event_participants::Column::Email.eq(email.clone()))
            .count(&self.conn)
            .await
            .context("Failed to check registration")?;

        if already > 0 {
            return Ok(false);
        }

        let active = event_participants::ActiveModel {
            event_id: Set(event_id),
            name: Set(name.to_string()),
            email: Set(email),
            registered_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(_) => Ok(true),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Ok(false),
                _ => Err(err).context("Failed to insert participant"),
            },
        }
    }

    /// Flipped after every bulk issuance pass, regardless of outcome.
    pub async fn mark_certificates_issued(&self, event_id: i32) -> Result<()> {
        let event = Events::find_by_id(event_id)
            .one(&self.conn)
            .await
            .context("Failed to query event")?
            .ok_or_else(|| anyhow::anyhow!("Event {event_id} not found"))?;

        let mut active: events::ActiveModel = event.into();
        active.certificates_issued = Set(true);
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        Events::find()
            .count(&self.conn)
            .await
            .context("Failed to count events")
    }
}
