//! Tipos compartilhados do kcache.

pub mod config;
pub mod errors;
pub mod ids;

pub use ids::{CacheHashKey, CacheItemId};
