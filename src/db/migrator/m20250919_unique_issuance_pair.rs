use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Closes the duplicate-issuance race: the application still checks for an
/// existing certificate before minting, but the database owns the invariant
/// that at most one certificate exists per (event name, student email) pair.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared(
            "DELETE FROM certificates WHERE rowid NOT IN (SELECT MIN(rowid) FROM certificates GROUP BY event_name, student_email)",
        )
        .await?;

        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_certificates_event_student_unique ON certificates(event_name, student_email)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared("DROP INDEX IF EXISTS idx_certificates_event_student_unique")
            .await?;

        Ok(())
    }
}
