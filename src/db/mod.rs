use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::certificates;
use crate::entities::event_participants;
use crate::entities::events::{self, CertificateStyle};
use crate::entities::invites;
use crate::entities::student_roster;
use crate::entities::users::Role;

pub mod migrator;
pub mod repositories;

pub use repositories::certificate::NewCertificate;
pub use repositories::event::NewEvent;
pub use repositories::roster::NewRosterEntry;
pub use repositories::user::{DepartmentCount, NewUser, UserRecord};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn event_repo(&self) -> repositories::event::EventRepository {
        repositories::event::EventRepository::new(self.conn.clone())
    }

    fn certificate_repo(&self) -> repositories::certificate::CertificateRepository {
        repositories::certificate::CertificateRepository::new(self.conn.clone())
    }

    fn roster_repo(&self) -> repositories::roster::RosterRepository {
        repositories::roster::RosterRepository::new(self.conn.clone())
    }

    fn invite_repo(&self) -> repositories::invite::InviteRepository {
        repositories::invite::InviteRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn user_by_id(&self, id: i32) -> Result<Option<UserRecord>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn user_by_api_key(&self, api_key: &str) -> Result<Option<UserRecord>> {
        self.user_repo().get_by_api_key(api_key).await
    }

    pub async fn user_exists_by_email_or_usn(&self, email: &str, usn: &str) -> Result<bool> {
        self.user_repo().exists_by_email_or_usn(email, usn).await
    }

    pub async fn verify_user_password(&self, email: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(email, password).await
    }

    pub async fn create_user(
        &self,
        new_user: NewUser,
        security: Option<&SecurityConfig>,
    ) -> Result<UserRecord> {
        self.user_repo().create(new_user, security).await
    }

    pub async fn update_user_password(&self, user_id: i32, new_password: &str) -> Result<()> {
        self.user_repo().update_password(user_id, new_password).await
    }

    pub async fn set_wallet_address(&self, user_id: i32, wallet: &str) -> Result<()> {
        self.user_repo().set_wallet_address(user_id, wallet).await
    }

    pub async fn list_students(&self) -> Result<Vec<UserRecord>> {
        self.user_repo().list_students().await
    }

    pub async fn delete_student(&self, user_id: i32) -> Result<bool> {
        self.user_repo().delete_student(user_id).await
    }

    pub async fn count_users_with_role(&self, role: Role) -> Result<u64> {
        self.user_repo().count_by_role(role).await
    }

    pub async fn students_by_department(&self) -> Result<Vec<DepartmentCount>> {
        self.user_repo().students_by_department().await
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub async fn create_event(&self, new_event: NewEvent) -> Result<events::Model> {
        self.event_repo().create(new_event).await
    }

    pub async fn get_event(&self, id: i32) -> Result<Option<events::Model>> {
        self.event_repo().get(id).await
    }

    pub async fn list_events(&self) -> Result<Vec<events::Model>> {
        self.event_repo().list_all().await
    }

    pub async fn list_public_events(&self) -> Result<Vec<events::Model>> {
        self.event_repo().list_public().await
    }

    pub async fn event_participants(
        &self,
        event_id: i32,
    ) -> Result<Vec<event_participants::Model>> {
        self.event_repo().participants(event_id).await
    }

    pub async fn add_event_participant(
        &self,
        event_id: i32,
        name: &str,
        email: &str,
    ) -> Result<bool> {
        self.event_repo().add_participant(event_id, name, email).await
    }

    pub async fn mark_event_certificates_issued(&self, event_id: i32) -> Result<()> {
        self.event_repo().mark_certificates_issued(event_id).await
    }

    pub async fn count_events(&self) -> Result<u64> {
        self.event_repo().count().await
    }

    /// Rendering style for an event, if one was configured.
    pub async fn certificate_style_for_event(
        &self,
        event_name: &str,
    ) -> Result<Option<CertificateStyle>> {
        Ok(self
            .event_repo()
            .get_by_name(event_name)
            .await?
            .and_then(|e| e.certificate_style))
    }

    // ========================================================================
    // Certificates
    // ========================================================================

    pub async fn certificate_by_pair(
        &self,
        event_name: &str,
        student_email: &str,
    ) -> Result<Option<certificates::Model>> {
        self.certificate_repo()
            .find_by_pair(event_name, student_email)
            .await
    }

    pub async fn certificate_by_public_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<certificates::Model>> {
        self.certificate_repo()
            .find_by_public_id(certificate_id)
            .await
    }

    pub async fn insert_certificate(
        &self,
        cert: NewCertificate,
    ) -> Result<Option<certificates::Model>> {
        self.certificate_repo().insert(cert).await
    }

    pub async fn certificates_for_student(
        &self,
        email: &str,
    ) -> Result<Vec<certificates::Model>> {
        self.certificate_repo().list_for_student(email).await
    }

    pub async fn count_certificates(&self) -> Result<u64> {
        self.certificate_repo().count().await
    }

    pub async fn certificates_by_department(
        &self,
    ) -> Result<Vec<repositories::certificate::DepartmentCount>> {
        self.certificate_repo().by_department().await
    }

    // ========================================================================
    // Roster
    // ========================================================================

    pub async fn roster_exists_by_email_or_usn(&self, email: &str, usn: &str) -> Result<bool> {
        self.roster_repo().exists_by_email_or_usn(email, usn).await
    }

    pub async fn insert_roster_entry(
        &self,
        entry: NewRosterEntry,
    ) -> Result<student_roster::Model> {
        self.roster_repo().insert(entry).await
    }

    pub async fn roster_entry(
        &self,
        email: &str,
        usn: &str,
    ) -> Result<Option<student_roster::Model>> {
        self.roster_repo().find_by_email_and_usn(email, usn).await
    }

    pub async fn delete_roster_entry(&self, id: i32) -> Result<()> {
        self.roster_repo().delete(id).await
    }

    // ========================================================================
    // Invites
    // ========================================================================

    pub async fn create_invite(
        &self,
        name: &str,
        email: &str,
        department: Option<&str>,
        usn: Option<&str>,
        role: Role,
    ) -> Result<invites::Model> {
        self.invite_repo()
            .create(name, email, department, usn, role)
            .await
    }

    pub async fn find_valid_invite(&self, token: &str) -> Result<Option<invites::Model>> {
        self.invite_repo().find_valid(token).await
    }

    pub async fn delete_invite(&self, id: i32) -> Result<()> {
        self.invite_repo().delete(id).await
    }
}
