pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod export;
pub mod inline;
pub mod orchestrator;
pub mod records;
pub mod server;
pub mod session;
pub mod upload;
