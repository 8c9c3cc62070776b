pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod moderation;
pub mod orchestrator;
pub mod store;
pub mod types;
