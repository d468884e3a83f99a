pub mod auth;
pub mod config;
pub mod stock;
pub mod sync;
pub mod watch;
