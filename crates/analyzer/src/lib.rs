pub mod config;
pub mod constants;
pub mod core;
pub mod errors;
pub mod logging;
pub mod narration_client;
pub mod types;
