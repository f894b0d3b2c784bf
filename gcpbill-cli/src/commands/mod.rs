//! Command implementations.

pub mod accounts;
pub mod check;
pub mod costs;
pub mod setup;
