//! Pure helpers shared by the analyzer, the caches and the admin layer

pub mod ministry;
pub mod title;
