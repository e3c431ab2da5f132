//! Request lifecycle, approval decisions and dashboard reads.

pub mod approval;
pub mod dashboard;
pub mod lifecycle;
