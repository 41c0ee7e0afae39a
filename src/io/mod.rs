//! Input helpers.
//!
//! - tabular source reader for CSV and workbooks (`source`)
//! - header normalization + column resolution (`columns`)
//! - datetime cell decoding (`datetime`)
//! - energy-load ingest into the canonical container (`ingest`)
//! - resource-profile alignment (`profile`)

pub mod columns;
pub mod datetime;
pub mod ingest;
pub mod profile;
pub mod source;

pub use columns::*;
pub use datetime::*;
pub use ingest::*;
pub use profile::*;
pub use source::*;
