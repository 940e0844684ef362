use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, Statement,
};

use crate::entities::certificates;
use crate::entities::prelude::*;

#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub certificate_id: String,
    pub token_id: String,
    pub certificate_hash: String,
    pub transaction_hash: String,
    pub student_name: String,
    pub student_email: String,
    pub event_name: String,
    pub event_date: String,
    pub issued_by: i32,
}

#[derive(Debug, Clone, FromQueryResult)]
pub struct DepartmentCount {
    pub name: Option<String>,
    pub count: i64,
}

pub struct CertificateRepository {
    conn: DatabaseConnection,
}

impl CertificateRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_pair(
        &self,
        event_name: &str,
        student_email: &str,
    ) -> Result<Option<certificates::Model>> {
        Certificates::find()
            .filter(certificates::Column::EventName.eq(event_name))
            .filter(certificates::Column::StudentEmail.eq(student_email.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query certificate by (event, student)")
    }

    /// Case-insensitive exact match on the public identifier. The
    /// comparison happens in SQL via UPPER(), so no pattern syntax from
    /// the caller ever reaches the query.
    pub async fn find_by_public_id(&self, certificate_id: &str) -> Result<Option<certificates::Model>> {
        Certificates::find()
            .filter(
                Expr::expr(Func::upper(Expr::col(certificates::Column::CertificateId)))
                    .eq(certificate_id.to_uppercase()),
            )
            .one(&self.conn)
            .await
            .context("Failed to query certificate by public ID")
    }

    /// Inserts the issuance snapshot. `Ok(None)` means the database
    /// rejected a duplicate (event, student) pair; the caller treats that
    /// exactly like the pre-insert existence check firing.
    pub async fn insert(&self, cert: NewCertificate) -> Result<Option<certificates::Model>> {
        let active = certificates::ActiveModel {
            certificate_id: Set(cert.certificate_id),
            token_id: Set(cert.token_id),
            certificate_hash: Set(cert.certificate_hash),
            transaction_hash: Set(cert.transaction_hash),
            student_name: Set(cert.student_name),
            student_email: Set(cert.student_email.to_lowercase()),
            event_name: Set(cert.event_name),
            event_date: Set(cert.event_date),
            issued_by: Set(cert.issued_by),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(model)),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Ok(None),
                _ => Err(err).context("Failed to insert certificate"),
            },
        }
    }

    pub async fn list_for_student(&self, email: &str) -> Result<Vec<certificates::Model>> {
        Certificates::find()
            .filter(certificates::Column::StudentEmail.eq(email.to_lowercase()))
            .order_by_desc(certificates::Column::EventDate)
            .all(&self.conn)
            .await
            .context("Failed to list certificates for student")
    }

    pub async fn count(&self) -> Result<u64> {
        Certificates::find()
            .count(&self.conn)
            .await
            .context("Failed to count certificates")
    }

    /// Certificates grouped by the holder's department, joining the live
    /// user record on the denormalized email.
    pub async fn by_department(&self) -> Result<Vec<DepartmentCount>> {
        let backend = self.conn.get_database_backend();

        DepartmentCount::find_by_statement(Statement::from_string(
            backend,
            "SELECT u.department AS name, COUNT(*) AS count \
             FROM certificates c \
             JOIN users u ON u.email = c.student_email \
             GROUP BY u.department \
             ORDER BY count DESC"
                .to_string(),
        ))
        .all(&self.conn)
        .await
        .context("Failed to group certificates by department")
    }
}
