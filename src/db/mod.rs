/// SQLite-backed object and translation record store.
mod connection;
mod queries;
mod stores;

pub use connection::Database;
