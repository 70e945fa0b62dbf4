//! ranktest: step-by-step Mann-Whitney U test solver.
//!
//! Computes the two-sided Mann-Whitney U test for two independent samples
//! and narrates every intermediate quantity (ranks, rank sums, U statistics,
//! decision) as an ordered sequence of report sections.

pub mod engine;
pub mod input;
pub mod report;
pub mod types;
