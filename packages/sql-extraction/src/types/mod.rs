//! Records, parsed data models and pipeline results.

pub mod model;
pub mod record;
pub mod result;
