pub mod cli;
pub mod config;
pub mod dedup;
pub mod domain;
pub mod errors;
pub mod fetch;
pub mod notify;
pub mod services;
pub mod storage;
