pub mod config;
pub mod dashboard;
pub mod dates;
pub mod fetch;
pub mod loader;
pub mod process;
pub mod schema;
pub mod table;
