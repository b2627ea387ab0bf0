//! Admin reconciliation: curated metadata on patterns and occurrences

pub mod ports;
pub mod service;

pub use ports::{DirectoryLookup, InstanceOverrideRepository};
pub use service::ReconciliationService;
