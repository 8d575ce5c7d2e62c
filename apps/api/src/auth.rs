use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_HEADER: &str = "x-user-id";
pub const OFFICE_HEADER: &str = "x-office-id";

/// Caller identity forwarded by the auth gateway.
///
/// Every query in the service is scoped to `office_id`; ids belonging to another
/// office are reported as not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfficeContext {
    pub user_id: Uuid,
    pub office_id: Uuid,
}

impl OfficeContext {
    fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, AppError> {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or(AppError::Unauthorized)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OfficeContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OfficeContext {
            user_id: Self::header_uuid(parts, USER_HEADER)?,
            office_id: Self::header_uuid(parts, OFFICE_HEADER)?,
        })
    }
}
