//! Core data model: identifiers, jobs and connections.

pub mod connection;
pub mod job;
pub mod types;
