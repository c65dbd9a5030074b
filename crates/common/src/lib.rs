pub mod types;
pub mod utils;
pub mod metrics;
pub mod admin_http;
