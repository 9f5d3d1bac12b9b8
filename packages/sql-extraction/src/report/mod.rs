//! Presentation of stored and consolidated models.

pub mod graph;
pub mod spreadsheet;

pub use graph::{DataModelGraph, EdgeKind, GraphEdge, GraphNode};
pub use spreadsheet::{build_workbook, sanitize_sheet_name};
