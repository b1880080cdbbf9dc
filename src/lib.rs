pub mod clean;
pub mod config;
pub mod pipeline;
pub mod storage;
pub mod table;
