pub mod auth;
pub mod rate_limit;

pub use auth::{agent_auth_middleware, AgentClaims};
pub use rate_limit::rate_limit_middleware;
