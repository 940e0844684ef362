use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users::{self, Role};

/// User data returned from the repository (without the password hash).
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub usn: Option<String>,
    pub api_key: String,
    pub role: Role,
    pub wallet_address: Option<String>,
    pub department: Option<String>,
    pub year: Option<i32>,
    pub semester: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for UserRecord {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            usn: model.usn,
            api_key: model.api_key,
            role: model.role,
            wallet_address: model.wallet_address,
            department: model.department,
            year: model.year,
            semester: model.semester,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Input for account creation (invite claim, roster activation, seeding).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub usn: Option<String>,
    pub password: String,
    pub role: Role,
    pub department: Option<String>,
    pub year: Option<i32>,
    pub semester: Option<String>,
}

#[derive(Debug, Clone, FromQueryResult)]
pub struct DepartmentCount {
    pub name: Option<String>,
    pub count: i64,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(UserRecord::from))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<UserRecord>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(UserRecord::from))
    }

    pub async fn exists_by_email_or_usn(&self, email: &str, usn: &str) -> Result<bool> {
        let count = users::Entity::find()
            .filter(
                users::Column::Email
                    .eq(email.to_lowercase())
                    .or(users::Column::Usn.eq(usn.to_lowercase())),
            )
            .count(&self.conn)
            .await
            .context("Failed to check user existence")?;

        Ok(count > 0)
    }

    /// Verify password for a user.
    /// Argon2 verification is CPU-bound, so it runs on a blocking task.
    pub async fn verify_password(&self, email: &str, password: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    pub async fn create(
        &self,
        new_user: NewUser,
        security: Option<&SecurityConfig>,
    ) -> Result<UserRecord> {
        let password = new_user.password.clone();
        let security = security.cloned();
        let password_hash =
            task::spawn_blocking(move || hash_password(&password, security.as_ref()))
                .await
                .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            name: Set(new_user.name),
            email: Set(new_user.email.to_lowercase()),
            usn: Set(new_user.usn.map(|u| u.to_lowercase())),
            password_hash: Set(password_hash),
            api_key: Set(generate_token()),
            role: Set(new_user.role),
            wallet_address: Set(None),
            department: Set(new_user.department),
            year: Set(new_user.year),
            semester: Set(new_user.semester),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(UserRecord::from(model))
    }

    pub async fn update_password(&self, user_id: i32, new_password: &str) -> Result<()> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?
            .ok_or_else(|| anyhow::anyhow!("User {user_id} not found"))?;

        let password = new_password.to_string();
        let new_hash = task::spawn_blocking(move || hash_password(&password, None))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn set_wallet_address(&self, user_id: i32, wallet: &str) -> Result<()> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for wallet binding")?
            .ok_or_else(|| anyhow::anyhow!("User {user_id} not found"))?;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.wallet_address = Set(Some(wallet.to_string()));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Verify API key and return the associated user.
    pub async fn get_by_api_key(&self, api_key: &str) -> Result<Option<UserRecord>> {
        let user = users::Entity::find()
            .filter(users::Column::ApiKey.eq(api_key))
            .one(&self.conn)
            .await
            .context("Failed to query user by API key")?;

        Ok(user.map(UserRecord::from))
    }

    pub async fn list_students(&self) -> Result<Vec<UserRecord>> {
        let rows = users::Entity::find()
            .filter(users::Column::Role.eq(Role::Student))
            .order_by_asc(users::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list students")?;

        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    pub async fn delete_student(&self, user_id: i32) -> Result<bool> {
        let result = users::Entity::delete_many()
            .filter(users::Column::Id.eq(user_id))
            .filter(users::Column::Role.eq(Role::Student))
            .exec(&self.conn)
            .await
            .context("Failed to delete student")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_by_role(&self, role: Role) -> Result<u64> {
        users::Entity::find()
            .filter(users::Column::Role.eq(role))
            .count(&self.conn)
            .await
            .context("Failed to count users by role")
    }

    pub async fn students_by_department(&self) -> Result<Vec<DepartmentCount>> {
        use sea_orm::{ConnectionTrait, Statement};

        let backend = self.conn.get_database_backend();

        DepartmentCount::find_by_statement(Statement::from_string(
            backend,
            "SELECT department AS name, COUNT(*) AS count \
             FROM users \
             WHERE role = 'Student' \
             GROUP BY department \
             ORDER BY count DESC"
                .to_string(),
        ))
        .all(&self.conn)
        .await
        .context("Failed to group students by department")
    }
}

/// Hash a password using Argon2id with optional custom params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Generate a random 64-character hex token (API keys, invite tokens).
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }
}
