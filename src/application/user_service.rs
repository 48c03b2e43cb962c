use std::sync::Arc;

use crate::domain::errors::{DomainError, Entity};
use crate::domain::metrics::{KeyValue, MetricsEmitter, ACTIVE_USERS_COUNT};
use crate::domain::ports::UserRepository;
use crate::domain::user::User;

pub struct UserService<R> {
    repo: R,
    metrics: Arc<dyn MetricsEmitter>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R, metrics: Arc<dyn MetricsEmitter>) -> Self {
        Self { repo, metrics }
    }

    /// Registers a user. An address that is already taken yields
    /// `DuplicateEntity`, whether it is caught by the lookup or by the
    /// unique constraint on a concurrent insert.
    pub fn create_user(&self, email: &str, name: &str) -> Result<User, DomainError> {
        let email = email.trim();
        let name = name.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::InvalidInput(format!(
                "invalid email address: '{email}'"
            )));
        }
        if name.is_empty() {
            return Err(DomainError::InvalidInput("name must not be empty".into()));
        }

        if self.repo.find_by_email(email)?.is_some() {
            return Err(DomainError::DuplicateEntity(format!("user {email}")));
        }
        let user = self.repo.create(email, name)?;

        log::info!("user created: user_id={}, email={}", user.id, user.email);
        self.metrics.gauge(
            ACTIVE_USERS_COUNT,
            1.0,
            &[
                KeyValue::new("session_type", "authenticated"),
                KeyValue::new("user_id", user.id),
            ],
        );
        Ok(user)
    }

    pub fn get_user(&self, id: i64) -> Result<User, DomainError> {
        self.repo
            .find_by_id(id)?
            .ok_or(DomainError::NotFound(Entity::User))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<User, DomainError> {
        self.repo
            .find_by_email(email.trim())?
            .ok_or(DomainError::NotFound(Entity::User))
    }
}
