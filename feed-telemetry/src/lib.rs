//! Telemetry bootstrap for the feed indexing workspace.

pub mod tracing;
