pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Caller identity used by the cart and order routes when none is given.
pub const DEFAULT_USER_ID: i64 = 1;

/// `?user_id=` query parameter. Missing or malformed values fall back to
/// [`DEFAULT_USER_ID`].
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserQuery {
    /// Acting user, defaults to 1
    #[param(value_type = Option<i64>)]
    pub user_id: Option<String>,
}

impl UserQuery {
    pub fn user_id(&self) -> i64 {
        self.user_id
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_USER_ID)
    }
}

/// Acknowledgement body for mutations that return no resource.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}
