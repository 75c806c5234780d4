//! Data models for portal entities.
//!
//! Only the grade shapes this tool consumes; the portal's wider data
//! model is out of scope.

pub mod grade;

pub use grade::{group_by_subject, Grade};
