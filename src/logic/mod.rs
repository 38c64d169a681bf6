pub mod app_data;
pub mod competition;
pub mod config;
pub mod error;
pub mod group;
pub mod io;
pub mod lock;
pub mod team;
pub mod time;
pub mod types;
