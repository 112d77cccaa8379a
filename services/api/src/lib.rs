//! services/api/src/lib.rs
//!
//! The library half of the `api` service. The binaries and the integration
//! tests build the application from these modules.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
