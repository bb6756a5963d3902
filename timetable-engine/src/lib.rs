//! Railway timetable engine.
//!
//! Detects resource conflicts in a timetable (platforms, track segments,
//! headways, maintenance closures), repairs them with the smallest legal
//! changes, and compares the outcome across what-if scenarios.

pub mod config;
pub mod constraints;
pub mod detect;
pub mod domain;
pub mod repair;
pub mod scenario;
pub mod timetable;
pub mod topology;
pub mod web;

#[cfg(test)]
mod fixtures;
