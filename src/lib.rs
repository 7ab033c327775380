pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod reftree;
pub mod resolution;
pub mod store;
pub mod types;
