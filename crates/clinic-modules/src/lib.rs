pub mod config;
pub mod error;
pub mod modules;
pub mod telemetry;
