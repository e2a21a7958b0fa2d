//! Symbol resolution across broker-specific naming drift.
//!
//! Brokers rename the same instrument freely: `XAUUSD`, `XAUUSDm`,
//! `GOLD.cash`, `XAUUSD.pro`. This crate maps an incoming symbol onto one
//! of a slave broker's available symbols through a cascade of increasingly
//! permissive strategies: exact match, curated mappings, alias tables,
//! normalization, and finally edit-distance fuzzy matching.

pub mod error;
pub mod normalize;
pub mod resolver;
pub mod similarity;
pub mod tables;

pub use error::{Result, SymbolsError};
pub use normalize::normalize_symbol;
pub use resolver::SymbolResolver;
pub use similarity::similarity;
