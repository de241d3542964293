//! Inspection priority scoring for right-of-way permits.
//!
//! Permit and roadway-segment extracts are joined against a segment catalog,
//! scored, ranked and handed to an open-data sink.

pub mod config;
pub mod error;
pub mod extracts;
pub mod telemetry;
pub mod workflows;
