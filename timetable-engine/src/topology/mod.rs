//! Network topology: stations, platforms and directed segments.
//!
//! The graph is loaded once per process and never mutated afterwards.

mod error;
mod graph;
mod network;

pub use error::TopologyError;
pub use graph::TopologyGraph;
pub use network::{NetworkDocument, Platform, Segment, Station};
