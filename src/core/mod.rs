pub mod config;
pub mod error;
pub mod idea;
pub mod io;
pub mod web_io;
