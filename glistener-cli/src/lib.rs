pub mod commands;
pub mod config;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use config::ListenerConfig;
pub use report::rounding::{format_half_up, round_half_up};
