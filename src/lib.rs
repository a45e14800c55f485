//! Grades spreadsheet lab submissions by replaying captured sessions against
//! golden `.exp` transcripts and reporting the first divergence per command.

pub mod diff;
pub mod expect;
pub mod grade;
pub mod render;
pub mod session;
pub mod suite;
pub mod table;
