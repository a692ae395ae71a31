pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod migrate;
pub mod quickstart;
pub mod redis_ext;
pub mod ui;
pub mod utils;
