//! v1 API Data Transfer Objects.
//!
//! These types define the wire format for the v1 REST API, separate from the
//! internal domain models in `src/models/` where the shapes differ.

pub mod duplicates;

pub use duplicates::*;
