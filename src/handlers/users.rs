use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::errors::DomainError;
use crate::domain::user::User;
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

enum Registration {
    Created(User),
    AlreadyRegistered(User),
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/v1/users
///
/// Registering an address that is already taken answers 409 with the
/// existing user, so clients can recover its id.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Malformed email or name"),
        (status = 409, description = "Email already registered; body is the existing user", body = UserResponse),
    ),
    tag = "users"
)]
pub async fn create_user(
    state: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let CreateUserRequest { email, name } = body.into_inner();

    let outcome = web::block(move || match state.users.create_user(&email, &name) {
        Ok(user) => Ok(Registration::Created(user)),
        Err(DomainError::DuplicateEntity(detail)) => {
            match state.users.get_user_by_email(&email) {
                Ok(existing) => Ok(Registration::AlreadyRegistered(existing)),
                Err(_) => Err(DomainError::DuplicateEntity(detail)),
            }
        }
        Err(e) => Err(e),
    })
    .await??;

    Ok(match outcome {
        Registration::Created(user) => HttpResponse::Created().json(UserResponse::from(user)),
        Registration::AlreadyRegistered(user) => {
            HttpResponse::Conflict().json(UserResponse::from(user))
        }
    })
}

/// GET /api/v1/users/{id}
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(
        ("id" = i64, Path, description = "User id"),
    ),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found"),
    ),
    tag = "users"
)]
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let user = web::block(move || state.users.get_user(id)).await??;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
