//! Recipe resolution for smeltable alloys.
//!
//! Given a [`catalog::Catalog`] of materials, [`calculator::calculate`]
//! turns a target amount into the base materials it takes to smelt it.

pub mod breakdown;
pub mod calculator;
pub mod catalog;
pub mod error;
pub mod percentages;
pub mod report;
pub mod tree;

#[cfg(test)]
mod test_support;

pub use calculator::{calculate, calculate_request, Requirements};
pub use catalog::{Catalog, MaterialCatalog};
pub use error::SmeltError;
