pub mod analytics;
pub mod config;
pub mod errors;
pub mod matching;
pub mod routes;
pub mod state;
pub mod taxonomy;
