pub mod rate_limit;
pub mod recent_url;
