pub mod backend;
pub mod calculation;
pub mod config;
pub mod database;
pub mod util;
