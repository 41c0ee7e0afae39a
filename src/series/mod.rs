//! Series conditioning and unit handling.
//!
//! - masking, resample decision, gap fill (`condition`)
//! - header unit inference and kW -> kWh conversion (`units`)

pub mod condition;
pub mod units;

pub use condition::*;
pub use units::*;
