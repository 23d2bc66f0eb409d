pub mod config;
pub mod relay;
