//! Utils Module
pub mod telemetry;
