//! Address resolution and enrollment engine for income-qualified assistance
//! programs.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
