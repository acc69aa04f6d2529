//! Runtime shell: configuration and background task management

pub mod config;
pub mod tasks;

pub use config::{Config, EnginePolicy};
pub use tasks::{BackgroundTasks, TaskKind};
