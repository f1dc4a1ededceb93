pub mod config;
pub mod error;
pub mod graph;
pub mod identity;
pub mod model;
pub mod server;
pub mod storage;
pub mod webhook;
