//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - loader configuration (`EnergyLoadConfig`, `ProfileConfig`, `ConditioningConfig`)
//! - encoding/unit enums (`DatetimeFormat`, `InterpolationMethod`, `SeriesUnit`)
//! - the canonical output (`CanonicalContainer`)

pub mod container;
pub mod types;

pub use container::*;
pub use types::*;
