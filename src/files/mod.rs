//! File helpers shared by the registry, ingestion and orchestrators.

pub mod atomic;
pub mod lock;
