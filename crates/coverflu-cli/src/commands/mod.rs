pub mod config;
pub mod preload;
pub mod simulate;
