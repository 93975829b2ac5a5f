// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod http_backend;
pub mod local_store;
pub mod location_feed;
