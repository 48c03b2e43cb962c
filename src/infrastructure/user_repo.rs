use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::User;
use crate::schema::users;

use super::models::{NewUserRow, UserRow};
use super::query_metrics::QueryMetrics;

pub struct DieselUserRepository {
    pool: DbPool,
    queries: QueryMetrics,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool, queries: QueryMetrics) -> Self {
        Self { pool, queries }
    }
}

impl UserRepository for DieselUserRepository {
    fn create(&self, email: &str, name: &str) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;
        let row = self.queries.time("INSERT", "users", || {
            diesel::insert_into(users::table)
                .values(&NewUserRow { email, name })
                .returning(UserRow::as_returning())
                .get_result(&mut conn)
        })?;
        Ok(row.into())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = self.queries.time("SELECT", "users", || {
            users::table
                .find(id)
                .select(UserRow::as_select())
                .first(&mut conn)
                .optional()
        })?;
        Ok(row.map(User::from))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = self.queries.time("SELECT", "users", || {
            users::table
                .filter(users::email.eq(email))
                .select(UserRow::as_select())
                .first(&mut conn)
                .optional()
        })?;
        Ok(row.map(User::from))
    }
}
