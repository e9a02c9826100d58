//! Mackerel: admin backend for trap-neuter-return rescue operations.
//!
//! The interesting part lives in the duplicate-record review pipeline:
//! three candidate streams normalized into one queue, tier-based
//! confidence scoring, and a resolution coordinator that routes staff
//! decisions back to the stream that owns each candidate.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod matching;
pub mod models;
pub mod scoring;
pub mod services;
