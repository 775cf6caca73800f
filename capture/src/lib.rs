pub mod api;
pub mod batch;
pub mod config;
pub mod endpoints;
pub mod fetch;
pub mod identity;
pub mod ingest;
pub mod keys;
pub mod last_batch;
pub mod prometheus;
pub mod query;
pub mod router;
pub mod server;
pub mod time;
pub mod utils;
