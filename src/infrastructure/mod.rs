pub mod block_store;
pub mod config;
pub mod error;
pub mod postgrest_store;
pub mod storage;
