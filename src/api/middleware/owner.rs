use crate::api::error::AppError;
use crate::services::import::types::Owner;
use axum::{extract::Request, middleware::Next, response::Response};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ORGANIZATION_ID_HEADER: &str = "x-organization-id";

const MAX_ID_LEN: usize = 128;

/// Resolves the caller from identity headers set by the upstream gateway
/// and stores an [`Owner`] in the request extensions.
pub async fn owner_middleware(mut req: Request, next: Next) -> Result<Response, AppError> {
    let user_id = header_value(&req, USER_ID_HEADER)?
        .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))?;
    let organization_id = header_value(&req, ORGANIZATION_ID_HEADER)?;

    req.extensions_mut().insert(Owner {
        user_id,
        organization_id,
    });
    Ok(next.run(req).await)
}

fn header_value(req: &Request, name: &str) -> Result<Option<String>, AppError> {
    let Some(raw) = req.headers().get(name) else {
        return Ok(None);
    };
    let value = raw
        .to_str()
        .map_err(|_| AppError::BadRequest(format!("{} must be visible ASCII", name)))?
        .trim();

    if value.is_empty() {
        return Ok(None);
    }
    if value.len() > MAX_ID_LEN {
        return Err(AppError::BadRequest(format!(
            "{} exceeds {} characters",
            name, MAX_ID_LEN
        )));
    }
    Ok(Some(value.to_string()))
}
