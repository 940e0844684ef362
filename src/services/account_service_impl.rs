//! `SeaORM` implementation of the `AccountService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::clients::mailer::Mailer;
use crate::config::SecurityConfig;
use crate::db::{NewUser, Store, UserRecord};
use crate::entities::users::Role;
use crate::services::account_service::{AccountError, AccountService};

pub struct SeaOrmAccountService {
    store: Store,
    mailer: Arc<dyn Mailer>,
    security: SecurityConfig,
}

impl SeaOrmAccountService {
    #[must_use]
    pub fn new(store: Store, mailer: Arc<dyn Mailer>, security: SecurityConfig) -> Self {
        Self {
            store,
            mailer,
            security,
        }
    }

    fn validate_new_password(password: &str) -> Result<(), AccountError> {
        if password.len() < 8 {
            return Err(AccountError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn login(&self, email: &str, password: &str) -> Result<UserRecord, AccountError> {
        let is_valid = self.store.verify_user_password(email, password).await?;

        if !is_valid {
            return Err(AccountError::InvalidCredentials);
        }

        self.store
            .user_by_email(email)
            .await?
            .ok_or(AccountError::InvalidCredentials)
    }

    async fn invite_faculty(
        &self,
        name: &str,
        email: &str,
        department: Option<&str>,
    ) -> Result<(), AccountError> {
        if self.store.user_by_email(email).await?.is_some() {
            return Err(AccountError::Validation(
                "A user with this email already exists.".to_string(),
            ));
        }

        let invite = self
            .store
            .create_invite(name, email, department, None, Role::Faculty)
            .await?;

        self.mailer.send_faculty_invite(email, &invite.token).await?;

        info!("Faculty invite sent to {email}");
        Ok(())
    }

    async fn claim_invite(
        &self,
        token: &str,
        password: &str,
    ) -> Result<UserRecord, AccountError> {
        Self::validate_new_password(password)?;

        let invite = self
            .store
            .find_valid_invite(token)
            .await?
            .filter(|i| i.role == Role::Faculty)
            .ok_or(AccountError::InvalidToken)?;

        if self.store.user_by_email(&invite.email).await?.is_some() {
            self.store.delete_invite(invite.id).await?;
            return Err(AccountError::Validation(
                "This invite was already used.".to_string(),
            ));
        }

        let user = self
            .store
            .create_user(
                NewUser {
                    name: invite.name.clone(),
                    email: invite.email.clone(),
                    usn: None,
                    password: password.to_string(),
                    role: Role::Faculty,
                    department: invite.department.clone(),
                    year: None,
                    semester: None,
                },
                Some(&self.security),
            )
            .await?;

        self.store.delete_invite(invite.id).await?;

        info!("Faculty account claimed for {}", user.email);
        Ok(user)
    }

    async fn request_student_activation(
        &self,
        email: &str,
        usn: &str,
    ) -> Result<(), AccountError> {
        let entry = self
            .store
            .roster_entry(email, usn)
            .await?
            .ok_or_else(|| {
                AccountError::NotFound(
                    "No pending roster entry matches that email and USN.".to_string(),
                )
            })?;

        if self.store.user_by_email(&entry.email).await?.is_some() {
            return Err(AccountError::Validation(
                "This account is already activated.".to_string(),
            ));
        }

        let invite = self
            .store
            .create_invite(
                &entry.name,
                &entry.email,
                Some(&entry.department),
                Some(&entry.usn),
                Role::Student,
            )
            .await?;

        self.mailer
            .send_student_activation(&entry.email, &invite.token)
            .await?;

        info!("Activation email sent to {}", entry.email);
        Ok(())
    }

    async fn activate_student(
        &self,
        token: &str,
        password: &str,
    ) -> Result<UserRecord, AccountError> {
        Self::validate_new_password(password)?;

        let invite = self
            .store
            .find_valid_invite(token)
            .await?
            .filter(|i| i.role == Role::Student)
            .ok_or(AccountError::InvalidToken)?;

        let usn = invite.usn.clone().ok_or(AccountError::InvalidToken)?;

        let entry = self
            .store
            .roster_entry(&invite.email, &usn)
            .await?
            .ok_or_else(|| {
                AccountError::NotFound("Pending roster entry no longer exists.".to_string())
            })?;

        if self.store.user_by_email(&entry.email).await?.is_some() {
            self.store.delete_invite(invite.id).await?;
            return Err(AccountError::Validation(
                "This account is already activated.".to_string(),
            ));
        }

        let user = self
            .store
            .create_user(
                NewUser {
                    name: entry.name.clone(),
                    email: entry.email.clone(),
                    usn: Some(entry.usn.clone()),
                    password: password.to_string(),
                    role: Role::Student,
                    department: Some(entry.department.clone()),
                    year: Some(entry.year),
                    semester: Some(entry.semester.clone()),
                },
                Some(&self.security),
            )
            .await?;

        // The pending row is consumed by activation.
        self.store.delete_roster_entry(entry.id).await?;
        self.store.delete_invite(invite.id).await?;

        info!("Student account activated for {}", user.email);
        Ok(user)
    }

    async fn change_password(
        &self,
        user_id: i32,
        email: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        Self::validate_new_password(new_password)?;

        if current_password == new_password {
            return Err(AccountError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let is_valid = self
            .store
            .verify_user_password(email, current_password)
            .await?;

        if !is_valid {
            return Err(AccountError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        self.store.update_user_password(user_id, new_password).await?;

        Ok(())
    }

    async fn bind_wallet(
        &self,
        user_id: i32,
        wallet_address: &str,
    ) -> Result<(), AccountError> {
        let stripped = wallet_address.strip_prefix("0x").unwrap_or("");
        if stripped.len() != 40 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AccountError::Validation(
                "Wallet address must be a 0x-prefixed 20-byte hex address".to_string(),
            ));
        }

        self.store
            .set_wallet_address(user_id, &wallet_address.to_lowercase())
            .await?;

        info!("Wallet bound for user {user_id}");
        Ok(())
    }
}

