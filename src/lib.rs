pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod prelude;
pub mod pricing;
pub mod record;
pub mod render;
pub mod store;
pub mod types;
