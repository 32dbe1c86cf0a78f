pub mod command;
pub mod config;
pub mod error;
pub mod job;
pub mod progress;
pub mod scheduler;
pub mod stage;
