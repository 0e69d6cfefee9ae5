use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

pub const AGENT_ROLE: &str = "agent";

/// Agent console token. `sub` is the agent's display name.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AgentClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Requires an HS256 bearer token with the agent role when a secret is configured.
pub async fn agent_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(secret) = state.auth.jwt_secret.as_deref() else {
        return Ok(next.run(req).await);
    };

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let token_data = decode::<AgentClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map_err(|_| AppError::AuthenticationError("Invalid token".to_string()))?;

    if token_data.claims.role != AGENT_ROLE {
        return Err(AppError::AuthenticationError("Agent role required".to_string()));
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
