use common::env_config::SessionConfig;
use middleware::auth::AuthMiddleware;

pub mod middleware {
    pub mod auth;
}

// Session middleware for the secured scope
pub fn auth_middleware(session: SessionConfig) -> AuthMiddleware {
    AuthMiddleware::new(session)
}
