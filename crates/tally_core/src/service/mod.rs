//! Core use-case services.
//!
//! # Responsibility
//! - Turn raw platform events into resolved submissions (`ingest_service`).
//! - Reduce submissions into credit decisions and reports (`tally_service`).

pub mod ingest_service;
pub mod tally_service;
