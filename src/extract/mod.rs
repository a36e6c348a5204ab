//! Value extraction pipeline
//!
//! Each module handles one stage between a matched node and a typed field.

mod coerce;
mod pattern;
mod value;

pub use coerce::*;
pub use pattern::*;
pub use value::*;
