// ESCO taxonomy: CSV parsing, the in-memory store and the background loader.

pub mod csv;
pub mod handlers;
pub mod loader;
pub mod models;
pub mod store;
