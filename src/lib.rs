pub mod api;
pub mod config;
pub mod error;
pub mod prediction;
pub mod server;
pub mod shutdown;
pub mod worker;
pub mod workflow;
