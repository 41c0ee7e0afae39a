//! `deropt-data` library crate.
//!
//! Ingests raw energy-load files (CSV or workbooks with arbitrary date
//! encodings and column naming) into a canonical, regularly spaced, kWh time
//! base, and aligns annual resource profiles onto it by time-of-year.
//!
//! The binary (`deropt`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the container can be handed to model-building code directly

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod series;
