pub mod auth;
pub mod engagement;
pub mod messages;
pub mod rate_limiter;
pub mod session;
pub mod social;
pub mod users;
