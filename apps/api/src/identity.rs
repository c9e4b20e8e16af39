//! Caller identity as asserted by the upstream gateway.
//!
//! Authentication happens before requests reach this service; the gateway
//! forwards the authenticated principal in `x-user-id` and `x-user-role`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::Serialize;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Candidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: i64,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let id = header(USER_ID_HEADER)
            .ok_or(AppError::Unauthorized)?
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized)?;

        let role = match header(USER_ROLE_HEADER).ok_or(AppError::Unauthorized)? {
            r if r.eq_ignore_ascii_case("admin") => Role::Admin,
            r if r.eq_ignore_ascii_case("candidate") => Role::Candidate,
            _ => return Err(AppError::Forbidden),
        };

        Ok(Identity { id, role })
    }
}
