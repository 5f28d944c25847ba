//! Logging setup for the feedback-triage engine.
//!
//! Human-readable and JSON-formatted structured output via
//! `tracing-subscriber`, with `RUST_LOG` taking precedence over the
//! caller's default filter.

pub mod logging;

pub use logging::{init_logging, init_logging_json};
