pub mod config;

pub use config::{ChatConfig, DATA_DIR_ENV};
