pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::app::session::SessionCodec;
use crate::config::rate_limits::RateLimits;
use crate::config::AppConfig;
use crate::infra::{cache::RedisCache, db::Db};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: RedisCache,
    pub sessions: SessionCodec,
    pub session_cookie_secure: bool,
    pub rate_limits: RateLimits,
}

impl AppState {
    pub fn new(config: &AppConfig, db: Db, cache: RedisCache) -> Self {
        Self {
            db,
            cache,
            sessions: SessionCodec::new(config.session_key, config.session_ttl_hours),
            session_cookie_secure: config.session_cookie_secure,
            rate_limits: config.rate_limits,
        }
    }
}
