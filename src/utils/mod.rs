//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `popsub_client` crate.
//!
//! It centralizes the error type every layer returns and the logging setup
//! used by the binary and by tests.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;
