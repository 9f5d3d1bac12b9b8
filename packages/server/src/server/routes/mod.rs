// HTTP routes
pub mod analyze;
pub mod data_model;
pub mod health;
pub mod report;

pub use analyze::*;
pub use data_model::*;
pub use health::*;
pub use report::*;
