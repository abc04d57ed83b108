pub mod analyze;
pub mod config;
pub mod engine;
pub mod feed;
pub mod history;
pub mod notify;
pub mod pipeline;
