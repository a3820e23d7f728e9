pub mod aspect_ratio;
pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod rate_limit;
pub mod routes;
pub mod suggestion;
pub mod time_control;
pub mod time_prompt;
