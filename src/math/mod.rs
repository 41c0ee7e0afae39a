//! Numeric utilities: calendar/grid arithmetic and gap-fill interpolation.

pub mod calendar;
pub mod interp;

pub use calendar::*;
pub use interp::*;
