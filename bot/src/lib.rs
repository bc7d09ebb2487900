pub mod cli;
pub mod config;
pub mod indexer;
pub mod server;
pub mod service;
